//! Record builders shared by the unit tests.

use chrono::NaiveDate;

use crate::model::{Gender, Person};

pub(crate) fn person(id: &str) -> Person {
    Person {
        id: id.to_string(),
        name: id.to_uppercase(),
        gender: Gender::Other,
        birth_date: NaiveDate::from_ymd_opt(1950, 1, 1).unwrap(),
        death_date: None,
        bio: String::new(),
        main_image: String::new(),
        gallery: Vec::new(),
        parent_id: None,
        spouse_id: None,
    }
}

pub(crate) trait PersonExt {
    fn parent(self, id: &str) -> Self;
    fn spouse(self, id: &str) -> Self;
}

impl PersonExt for Person {
    fn parent(mut self, id: &str) -> Self {
        self.parent_id = Some(id.to_string());
        self
    }

    fn spouse(mut self, id: &str) -> Self {
        self.spouse_id = Some(id.to_string());
        self
    }
}

pub(crate) fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}
