//! The `labnote check` command: keyword checklist and length hint per question.

use std::path::PathBuf;

use anyhow::Result;

use labnote_core::template::{remaining_chars, QuestionId, FULL_LENGTH};

use super::open;

pub fn execute(session: PathBuf, config: Option<PathBuf>) -> Result<()> {
    let (app, _) = open(&session, config.as_deref())?;
    let title = app.active_title();
    println!("{title}");

    for id in QuestionId::all_for(title) {
        let question = id.question();
        let answer = app.current.answer(id);
        println!("\nQ{}. {}", id.index + 1, question.text);
        println!("    field: {}", id.field_name());

        for (keyword, found) in question.keyword_status(answer) {
            let mark = if found { "x" } else { " " };
            println!("    [{mark}] {keyword}");
        }

        let chars = answer.chars().count();
        match remaining_chars(answer) {
            Some(left) => println!("    {chars}/{FULL_LENGTH} chars, {left} to go"),
            None => println!("    {chars} chars"),
        }
    }
    Ok(())
}
