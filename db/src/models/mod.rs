pub mod attendance_session;
pub mod check_in;
pub mod excuse_request;
pub mod section;
pub mod user;
pub mod user_section_role;

pub use attendance_session::Entity as AttendanceSession;
pub use check_in::Entity as CheckIn;
pub use excuse_request::Entity as ExcuseRequest;
pub use section::Entity as Section;
pub use user::Entity as User;
pub use user_section_role::Entity as UserSectionRole;
