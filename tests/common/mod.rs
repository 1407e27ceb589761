//! Shared fixtures: a small campus of users over in-memory stores

#![allow(dead_code)]

use std::sync::Arc;

use bulletin::auth::Caller;
use bulletin::news::{NewsDraft, NewsItem};
use bulletin::server::{AppState, Stores};
use bulletin::store::{MemoryUserDirectory, UserRecord};
use bulletin::types::{UserRole, Visibility};
use bulletin::Args;

pub const ADMIN: &str = "a1";
pub const STUDENTS: [&str; 3] = ["s1", "s2", "s3"];
pub const FACULTY: [&str; 2] = ["f1", "f2"];

pub fn record(id: &str, role: UserRole) -> UserRecord {
    UserRecord {
        id: id.into(),
        username: format!("user-{}", id),
        role,
        is_admin: role == UserRole::Admin,
    }
}

pub fn campus() -> Arc<MemoryUserDirectory> {
    let mut users = vec![record(ADMIN, UserRole::Admin)];
    users.extend(STUDENTS.iter().map(|id| record(id, UserRole::Student)));
    users.extend(FACULTY.iter().map(|id| record(id, UserRole::Faculty)));
    Arc::new(MemoryUserDirectory::with_users(users))
}

pub fn state() -> AppState {
    AppState::in_memory(Args::dev(), campus()).expect("in-memory state")
}

pub fn state_with(stores: Stores) -> AppState {
    AppState::new(Args::dev(), "memory", stores).expect("state")
}

pub fn admin() -> Caller {
    Caller::new(ADMIN.into(), "user-a1", UserRole::Admin, true)
}

pub fn student(id: &str) -> Caller {
    Caller::new(id.into(), format!("user-{}", id), UserRole::Student, false)
}

pub fn faculty(id: &str) -> Caller {
    Caller::new(id.into(), format!("user-{}", id), UserRole::Faculty, false)
}

pub fn draft(title: &str, role: Visibility, category: &str) -> NewsDraft {
    NewsDraft {
        title: title.into(),
        content: format!("{} - details inside", title),
        category: category.into(),
        image: None,
        role: Some(role),
    }
}

pub async fn publish(state: &AppState, title: &str, role: Visibility, category: &str) -> NewsItem {
    state
        .newsroom
        .create(&admin(), draft(title, role, category))
        .await
        .expect("create news")
}
