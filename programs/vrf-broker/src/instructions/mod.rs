pub mod close_subscription;
pub mod fulfill_random_words;
pub mod fund_and_request;
pub mod open_subscription;
pub mod reissue_request;
pub mod request_random_number;
pub mod rotate_key_hash;
pub mod top_up_subscription;
pub mod withdraw;
