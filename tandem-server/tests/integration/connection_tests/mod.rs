mod test_http_api;
