//! Listing, search and archive behaviour as seen by different callers

mod common;

use std::collections::HashSet;
use std::time::Duration;

use bulletin::news::{NewsEdit, NewsQuery};
use bulletin::types::{BulletinError, ContentId, Visibility};
use common::{admin, faculty, publish, state, student};

fn query(raw: &str) -> NewsQuery {
    NewsQuery::from_query_string(Some(raw)).expect("query")
}

#[tokio::test]
async fn non_admins_only_see_all_or_own_role() {
    let state = state();
    publish(&state, "Campus open", Visibility::All, "General").await;
    publish(&state, "Exam rooms", Visibility::Student, "Academics").await;
    publish(&state, "Staff meeting", Visibility::Faculty, "General").await;

    let seen = state.visibility.list(&student("s1"), &query("")).await.unwrap();
    assert_eq!(seen.len(), 2);
    assert!(seen
        .iter()
        .all(|i| matches!(i.role, Visibility::All | Visibility::Student)));

    let seen = state.visibility.list(&faculty("f1"), &query("")).await.unwrap();
    assert_eq!(seen.len(), 2);
    assert!(seen
        .iter()
        .all(|i| matches!(i.role, Visibility::All | Visibility::Faculty)));

    let everything = state.visibility.list(&admin(), &query("")).await.unwrap();
    assert_eq!(everything.len(), 3);
}

#[tokio::test]
async fn role_parameter_narrows_never_widens() {
    let state = state();
    publish(&state, "Campus open", Visibility::All, "General").await;
    publish(&state, "Exam rooms", Visibility::Student, "Academics").await;
    publish(&state, "Staff meeting", Visibility::Faculty, "General").await;

    let admin_view = state
        .visibility
        .list(&admin(), &query("role=student"))
        .await
        .unwrap();
    let titles: HashSet<String> = admin_view.into_iter().map(|i| i.title).collect();
    assert_eq!(
        titles,
        HashSet::from(["Campus open".to_string(), "Exam rooms".to_string()])
    );

    // A student asking for faculty items still gets nothing beyond `all`
    let student_view = state
        .visibility
        .list(&student("s1"), &query("role=faculty"))
        .await
        .unwrap();
    assert_eq!(student_view.len(), 1);
    assert_eq!(student_view[0].role, Visibility::All);

    assert!(matches!(
        state.visibility.list(&admin(), &query("role=janitor")).await,
        Err(BulletinError::BadRequest(_))
    ));
}

#[tokio::test]
async fn listings_are_newest_first() {
    let state = state();
    for title in ["first", "second", "third"] {
        publish(&state, title, Visibility::All, "General").await;
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    let titles: Vec<String> = state
        .visibility
        .list(&student("s1"), &query(""))
        .await
        .unwrap()
        .into_iter()
        .map(|i| i.title)
        .collect();
    assert_eq!(titles, vec!["third", "second", "first"]);
}

#[tokio::test]
async fn archive_excludes_unless_requested() {
    let state = state();
    let kept = publish(&state, "Bus routes", Visibility::All, "General").await;
    let hidden = publish(&state, "Parking permits", Visibility::All, "General").await;
    let reader = student("s1");

    let outcome = state.archive.toggle(&reader, hidden.id.as_str()).await.unwrap();
    assert!(outcome.archived);
    assert_eq!(outcome.news.map(|n| n.id), Some(hidden.id.clone()));

    let listed = state.visibility.list(&reader, &query("")).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, kept.id);

    let with_archived = state
        .visibility
        .list(&reader, &query("includeArchived=true"))
        .await
        .unwrap();
    assert_eq!(with_archived.len(), 2);

    // Another user's listing is unaffected
    let other = state.visibility.list(&student("s2"), &query("")).await.unwrap();
    assert_eq!(other.len(), 2);
}

#[tokio::test]
async fn archived_listing_is_archive_set_intersect_existing() {
    let state = state();
    let a = publish(&state, "Orientation", Visibility::All, "Events").await;
    let b = publish(&state, "Chess club", Visibility::All, "Sports").await;
    publish(&state, "Unarchived", Visibility::All, "General").await;
    let reader = student("s1");

    state.archive.toggle(&reader, a.id.as_str()).await.unwrap();
    state.archive.toggle(&reader, b.id.as_str()).await.unwrap();
    // Well-formed but unknown, and malformed; both are skipped
    state
        .archive
        .toggle(&reader, ContentId::generate().as_str())
        .await
        .unwrap();
    state.archive.toggle(&reader, "not-an-id").await.unwrap();

    let archived: HashSet<ContentId> = state
        .visibility
        .archived(&reader, &query(""))
        .await
        .unwrap()
        .into_iter()
        .map(|i| i.id)
        .collect();
    assert_eq!(archived, HashSet::from([a.id, b.id]));
}

#[tokio::test]
async fn archived_listing_allow_list_applies_to_non_admins_only() {
    let state = state();
    let club = publish(&state, "Robotics signup", Visibility::All, "Clubs").await;

    state.archive.toggle(&student("s1"), club.id.as_str()).await.unwrap();
    state.archive.toggle(&admin(), club.id.as_str()).await.unwrap();

    let for_student = state
        .visibility
        .archived(&student("s1"), &query(""))
        .await
        .unwrap();
    assert!(for_student.is_empty());

    let for_admin = state.visibility.archived(&admin(), &query("")).await.unwrap();
    assert_eq!(for_admin.len(), 1);
}

#[tokio::test]
async fn archive_toggle_is_its_own_inverse() {
    let state = state();
    let a = publish(&state, "Term dates", Visibility::All, "General").await;
    let b = publish(&state, "Gym closed", Visibility::All, "Sports").await;
    let reader = student("s1");

    state.archive.toggle(&reader, a.id.as_str()).await.unwrap();
    let before = state.stores.prefs.get(&reader.id).await.unwrap().unwrap();

    state.archive.toggle(&reader, b.id.as_str()).await.unwrap();
    let back = state.archive.toggle(&reader, b.id.as_str()).await.unwrap();

    assert!(!back.archived);
    assert_eq!(back.archived_news_ids, before.archived_news_ids);
}

#[tokio::test]
async fn delete_pulls_id_from_every_archive() {
    let state = state();
    let doomed = publish(&state, "Cancelled lecture", Visibility::All, "Academics").await;
    let survivor = publish(&state, "Rescheduled lecture", Visibility::All, "Academics").await;

    for id in ["s1", "s2"] {
        state.archive.toggle(&student(id), doomed.id.as_str()).await.unwrap();
    }
    state
        .archive
        .toggle(&faculty("f1"), survivor.id.as_str())
        .await
        .unwrap();

    state.newsroom.delete(&admin(), &doomed.id).await.unwrap();

    for id in ["s1", "s2"] {
        let prefs = state.stores.prefs.get(&id.into()).await.unwrap().unwrap();
        assert!(!prefs.has_archived(doomed.id.as_str()));
    }
    let f1 = state.stores.prefs.get(&"f1".into()).await.unwrap().unwrap();
    assert!(f1.has_archived(survivor.id.as_str()));
}

#[tokio::test]
async fn since_filter_sees_updates() {
    let state = state();
    let item = publish(&state, "Timetable", Visibility::All, "Academics").await;
    tokio::time::sleep(Duration::from_millis(5)).await;
    let t1 = chrono::Utc::now();
    tokio::time::sleep(Duration::from_millis(5)).await;

    let edit = NewsEdit {
        title: "Timetable v2".into(),
        content: "Rooms changed".into(),
        image: None,
    };
    let updated = state.newsroom.update(&admin(), &item.id, edit).await.unwrap();
    let t2 = updated.updated_at;
    assert!(t2 > t1);

    let after_t1 = state
        .visibility
        .list(&student("s1"), &query(&format!("since={}", t1.timestamp_millis())))
        .await
        .unwrap();
    assert_eq!(after_t1.len(), 1);

    let after_t2 = state
        .visibility
        .list(
            &student("s1"),
            &query(&format!("since={}", t2.timestamp_millis() + 1)),
        )
        .await
        .unwrap();
    assert!(after_t2.is_empty());

    assert!(matches!(
        state.visibility.list(&student("s1"), &query("since=yesterday")).await,
        Err(BulletinError::BadRequest(_))
    ));
}

#[tokio::test]
async fn search_matches_tokens_and_requires_a_term() {
    let state = state();
    publish(&state, "Midterm Schedule Released", Visibility::All, "Academics").await;
    publish(&state, "Football final", Visibility::All, "Sports").await;

    let hits = state
        .visibility
        .search(&student("s1"), &query("q=schedule"))
        .await
        .unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].title, "Midterm Schedule Released");

    for raw in ["", "q=", "q=%20%20", "q=a"] {
        assert!(matches!(
            state.visibility.search(&student("s1"), &query(raw)).await,
            Err(BulletinError::BadRequest(_))
        ));
    }
}

#[tokio::test]
async fn hidden_item_is_forbidden_missing_item_is_not_found() {
    let state = state();
    let staff_only = publish(&state, "Payroll", Visibility::Faculty, "General").await;

    assert!(matches!(
        state.visibility.fetch_one(&student("s1"), &staff_only.id).await,
        Err(BulletinError::Forbidden(_))
    ));
    assert!(matches!(
        state
            .visibility
            .fetch_one(&student("s1"), &ContentId::generate())
            .await,
        Err(BulletinError::NotFound(_))
    ));
    assert!(state
        .visibility
        .fetch_one(&faculty("f1"), &staff_only.id)
        .await
        .is_ok());
}
