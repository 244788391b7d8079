//! The `labnote info` command: show or edit identity and session metadata.

use std::path::PathBuf;

use anyhow::Result;
use chrono::NaiveDate;

use labnote_core::model::GlobalInfo;

use super::{edit_session, open};

/// Identity fields to overwrite; `None` leaves a field as it is.
#[derive(Debug, Default)]
pub struct InfoUpdate {
    pub date: Option<NaiveDate>,
    pub class_name: Option<String>,
    pub seat_number: Option<String>,
    pub student_id: Option<String>,
    pub student_name: Option<String>,
    pub partner1_id: Option<String>,
    pub partner1_name: Option<String>,
    pub partner2_id: Option<String>,
    pub partner2_name: Option<String>,
}

impl InfoUpdate {
    fn is_empty(&self) -> bool {
        self.date.is_none()
            && [
                &self.class_name,
                &self.seat_number,
                &self.student_id,
                &self.student_name,
                &self.partner1_id,
                &self.partner1_name,
                &self.partner2_id,
                &self.partner2_name,
            ]
            .iter()
            .all(|f| f.is_none())
    }

    fn apply(self, global: &mut GlobalInfo) {
        if let Some(date) = self.date {
            global.exp_date = date;
        }
        let pairs = [
            (self.class_name, &mut global.class_name),
            (self.seat_number, &mut global.seat_number),
            (self.student_id, &mut global.student_id),
            (self.student_name, &mut global.student_name),
            (self.partner1_id, &mut global.partner1_id),
            (self.partner1_name, &mut global.partner1_name),
            (self.partner2_id, &mut global.partner2_id),
            (self.partner2_name, &mut global.partner2_name),
        ];
        for (value, slot) in pairs {
            if let Some(value) = value {
                *slot = value;
            }
        }
    }
}

pub fn execute(session: PathBuf, update: InfoUpdate, config: Option<PathBuf>) -> Result<()> {
    let app = if update.is_empty() {
        open(&session, config.as_deref())?.0
    } else {
        edit_session(&session, config.as_deref(), |app| {
            update.apply(&mut app.global);
            Ok(())
        })?
    };

    let g = &app.global;
    println!("Title:    {}", app.active_title());
    println!("Date:     {}", g.exp_date.format("%Y-%m-%d"));
    println!("Class:    {}  Seat: {}", g.class_name, g.seat_number);
    println!("Student:  {} {}", g.student_id, g.student_name);
    for (i, (id, name)) in [(&g.partner1_id, &g.partner1_name), (&g.partner2_id, &g.partner2_name)]
        .into_iter()
        .enumerate()
    {
        if !id.is_empty() || !name.is_empty() {
            println!("Partner{}: {id} {name}", i + 1);
        }
    }
    if g.is_default_identity() {
        eprintln!("Warning: student id or name is still the factory default.");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_overwrites_only_given_fields() {
        let mut global = GlobalInfo::new(NaiveDate::from_ymd_opt(2025, 4, 10).unwrap());
        let update = InfoUpdate {
            student_name: Some("山田 花子".into()),
            partner2_id: Some("31".into()),
            ..Default::default()
        };
        assert!(!update.is_empty());
        update.apply(&mut global);
        assert_eq!(global.student_name, "山田 花子");
        assert_eq!(global.partner2_id, "31");
        assert_eq!(global.class_name, "1年1組");
        assert!(InfoUpdate::default().is_empty());
    }
}
