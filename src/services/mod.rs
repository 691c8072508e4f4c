pub mod activity_api;
