use tandem_core::Role;

use crate::error::RoomFull;
use crate::signaling::ConnectionId;

/// Two-slot pairing of a host and a guest connection.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Room {
    host: Option<ConnectionId>,
    guest: Option<ConnectionId>,
}

impl Room {
    pub fn occupant(&self, role: Role) -> Option<ConnectionId> {
        match role {
            Role::Host => self.host,
            Role::Guest => self.guest,
        }
    }

    /// Whoever sits in the slot opposite `role`.
    pub fn peer_of(&self, role: Role) -> Option<ConnectionId> {
        self.occupant(role.opposite())
    }

    pub fn is_empty(&self) -> bool {
        self.host.is_none() && self.guest.is_none()
    }

    /// Puts `id` into the `role` slot and returns the other occupant, if any
    /// and if it isn't `id` itself.
    ///
    /// Binding the same connection to the slot it already holds is a no-op.
    pub fn try_bind(&mut self, role: Role, id: ConnectionId) -> Result<Option<ConnectionId>, RoomFull> {
        let slot_taken = self.occupant(role).is_some_and(|current| current != id);
        let room_taken = self.host.is_some_and(|host| host != id)
            && self.guest.is_some_and(|guest| guest != id);
        if slot_taken || room_taken {
            return Err(RoomFull);
        }

        *self.slot_mut(role) = Some(id);
        Ok(self.peer_of(role).filter(|peer| *peer != id))
    }

    /// Clears the `role` slot if `id` still holds it.
    pub fn release(&mut self, role: Role, id: ConnectionId) -> bool {
        let slot = self.slot_mut(role);
        if *slot == Some(id) {
            *slot = None;
            true
        } else {
            false
        }
    }

    fn slot_mut(&mut self, role: Role) -> &mut Option<ConnectionId> {
        match role {
            Role::Host => &mut self.host,
            Role::Guest => &mut self.guest,
        }
    }
}
