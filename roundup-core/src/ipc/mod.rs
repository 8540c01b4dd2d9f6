//! IPC event types shared with the host application.

pub mod events;
