pub mod resilient_client;
