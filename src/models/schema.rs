//! 저장소 스키마 계약
//!
//! 코어가 참조하는 테이블과 필드 이름. 실제 테이블은 저장소가 소유한다.

pub mod students {
    pub const TABLE: &str = "students";
    pub const STUDENT_ID: &str = "student_id";
    pub const NAME: &str = "name";
    pub const MAJOR_CODE: &str = "major_code";
    pub const COMPLETED_SEMESTER: &str = "completed_semester";
    pub const ADMISSION_YEAR: &str = "admission_year";
}

pub mod major {
    pub const TABLE: &str = "major";
    pub const COLLEGE: &str = "college";
    pub const DEPARTMENT: &str = "department";
    pub const DEPT_CODE: &str = "dept_code";
    pub const MAJOR_NAME: &str = "major_name";
    pub const MAJOR_CODE: &str = "major_code";
}

pub mod courses {
    pub const TABLE: &str = "courses";
    pub const COURSE_CODE: &str = "course_code";
    pub const COURSE_NAME: &str = "course_name";
    pub const CREDITS: &str = "credits";
    pub const COURSE_TYPE: &str = "course_type";
    pub const DEPARTMENT: &str = "department";
    pub const PROFESSOR: &str = "professor";
    pub const NOTE: &str = "note";
    pub const TARGET_GRADE: &str = "target_grade";
    pub const OFFERED_YEAR: &str = "offered_year";
    pub const OFFERED_SEMESTER: &str = "offered_semester";
}

pub mod enrollments {
    pub const TABLE: &str = "enrollments";
    pub const STUDENT_ID: &str = "student_id";
    pub const COURSE_CODE: &str = "course_code";
    pub const GRADE: &str = "grade";
    pub const ENROLLMENT_SEMESTER: &str = "enrollment_semester";
}

/// 저장소가 소유한 모든 테이블
pub const TABLES: [&str; 4] = [
    students::TABLE,
    major::TABLE,
    courses::TABLE,
    enrollments::TABLE,
];

/// 학생 신원을 드러내는 필드
pub const IDENTITY_FIELDS: [&str; 2] = [students::STUDENT_ID, students::NAME];

/// 필드가 학생 신원 필드인지 확인
pub fn is_identity_field(field: &str) -> bool {
    IDENTITY_FIELDS.contains(&field)
}
