pub mod progress_transaction;
pub mod reward;
pub mod reward_redemption;
pub mod user_progress;
