// Clients for collaborating services.

pub mod directory;
