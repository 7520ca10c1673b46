mod test_ice_candidate_exchange;
mod test_offer_relayed_to_guest;
