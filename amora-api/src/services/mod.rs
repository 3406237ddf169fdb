pub mod auth_service;
pub mod matching;
pub mod token_service;
pub mod upload_service;
