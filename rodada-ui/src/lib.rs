//! Browser front end: registration form, admin login and the live dashboard.

pub mod app;
pub mod bridge;
pub mod display;

pub fn mount() {
    leptos::mount_to_body(app::App);
}
