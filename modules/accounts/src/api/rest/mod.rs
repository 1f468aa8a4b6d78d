pub mod resource;
pub mod routes;
