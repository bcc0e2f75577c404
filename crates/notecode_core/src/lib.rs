pub mod domain;
pub mod ports;

pub use domain::{NewNote, Note, NoteUpdate, UpsertUser, User, UserCredentials, DEFAULT_LANGUAGE};
pub use ports::{AuthStore, EntityStore, PortError, PortResult};
