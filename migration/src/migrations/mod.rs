pub mod m202602090001_create_users;
pub mod m202602090002_create_sections;
pub mod m202602090003_create_user_section_roles;
pub mod m202602090004_create_attendance;
pub mod m202602090005_create_excuse_requests;
