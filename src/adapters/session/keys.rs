//! Key layout shared by the session store adapters.

use crate::domain::foundation::UserId;

pub const LESSON_TEMP_KEY: &str = "lesson";

pub fn state_key(user: &UserId) -> String {
    format!("user:{}:state", user)
}

pub fn temp_key(user: &UserId, key: &str) -> String {
    format!("user:{}:temp:{}", user, key)
}

pub fn lesson_key(user: &UserId) -> String {
    temp_key(user, LESSON_TEMP_KEY)
}

pub fn jwt_key(user: &UserId) -> String {
    format!("user:{}:jwt_token", user)
}

pub fn link_key(user: &UserId) -> String {
    format!("user:{}:link_token", user)
}

pub fn lock_key(user: &UserId) -> String {
    format!("user:{}:lock:lesson", user)
}
