//! External service clients used by the jobs.

pub mod bunny_stream;

pub use bunny_stream::BunnyStreamClient;
