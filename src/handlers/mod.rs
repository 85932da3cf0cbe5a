pub mod entries;
pub mod health;
pub mod paper_diary;
