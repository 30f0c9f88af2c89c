pub mod emission;
pub mod geocode;
pub mod lenient;
pub mod pickup;
pub mod point;
pub mod route;
