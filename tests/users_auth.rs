// tests/users_auth.rs
use auto_hr_monitor::users::{UserStore, ADMIN_USERNAME};

fn store(dir: &tempfile::TempDir) -> UserStore {
    UserStore::new(dir.path().join("users.json"), dir.path().join("access_log.json"))
}

#[test]
fn seeded_admin_can_log_in() {
    let dir = tempfile::tempdir().unwrap();
    let users = store(&dir);
    users.ensure_seed_admin("admin123").unwrap();

    let identity = users.verify_login(ADMIN_USERNAME, "admin123").unwrap().unwrap();
    assert_eq!(identity.username, "admin");
    assert_eq!(identity.role, "admin");

    assert!(users.verify_login(ADMIN_USERNAME, "wrong").unwrap().is_none());
    assert!(users.verify_login("nobody", "admin123").unwrap().is_none());
}

#[test]
fn seeding_twice_does_not_reset_the_password() {
    let dir = tempfile::tempdir().unwrap();
    let users = store(&dir);
    users.ensure_seed_admin("admin123").unwrap();
    users.change_password(ADMIN_USERNAME, "rotated").unwrap();

    users.ensure_seed_admin("admin123").unwrap();
    assert!(users.verify_login(ADMIN_USERNAME, "rotated").unwrap().is_some());
    assert!(users.verify_login(ADMIN_USERNAME, "admin123").unwrap().is_none());
}

#[test]
fn disabled_users_cannot_log_in() {
    let dir = tempfile::tempdir().unwrap();
    let users = store(&dir);
    users.create_user("li", "pw123456", "李工", "user").unwrap();

    assert!(users.verify_login("li", "pw123456").unwrap().is_some());
    assert!(users.set_enabled("li", false).unwrap());
    assert!(users.verify_login("li", "pw123456").unwrap().is_none());
    assert!(users.set_enabled("li", true).unwrap());
    assert!(users.verify_login("li", "pw123456").unwrap().is_some());
}

#[test]
fn admin_account_is_protected() {
    let dir = tempfile::tempdir().unwrap();
    let users = store(&dir);
    users.ensure_seed_admin("admin123").unwrap();

    assert!(!users.remove_user(ADMIN_USERNAME).unwrap());
    assert!(!users.set_enabled(ADMIN_USERNAME, false).unwrap());
}

#[test]
fn duplicate_usernames_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let users = store(&dir);
    assert!(users.create_user("li", "a-password", "李工", "user").unwrap());
    assert!(!users.create_user("li", "b-password", "另一个李工", "user").unwrap());
}

#[test]
fn logins_and_views_land_in_the_access_log() {
    let dir = tempfile::tempdir().unwrap();
    let users = store(&dir);
    users.ensure_seed_admin("admin123").unwrap();
    users.create_user("li", "pw123456", "李工", "user").unwrap();

    users.verify_login("li", "pw123456").unwrap().unwrap();
    users.record_view("li", "小米汽车启动2025校招").unwrap();
    users.verify_login(ADMIN_USERNAME, "admin123").unwrap().unwrap();

    let all = users.recent_logs(None, 10).unwrap();
    assert_eq!(all.len(), 3);
    // Newest first.
    assert_eq!(all[0].username, "admin");
    assert_eq!(all[0].action, "login");

    let li_only = users.recent_logs(Some("li"), 10).unwrap();
    assert_eq!(li_only.len(), 2);
    assert_eq!(li_only[0].action, "view_news");
    assert_eq!(li_only[0].news_title.as_deref(), Some("小米汽车启动2025校招"));
}

#[test]
fn stored_hashes_are_salted() {
    let dir = tempfile::tempdir().unwrap();
    let users = store(&dir);
    users.create_user("a", "same-password", "A", "user").unwrap();
    users.create_user("b", "same-password", "B", "user").unwrap();

    let listed = users.list_users().unwrap();
    let hash_a = &listed.iter().find(|(n, _)| n == "a").unwrap().1.password_hash;
    let hash_b = &listed.iter().find(|(n, _)| n == "b").unwrap().1.password_hash;
    assert_ne!(hash_a, hash_b);
    assert!(hash_a.contains('$'));
}
