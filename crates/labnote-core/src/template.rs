//! Per-title templates: the take-home questions and their required keywords.

use crate::model::ExperimentTitle;

/// Prefix of every answer field name in a snapshot.
pub const ANSWER_PREFIX: &str = "設問_";

/// Length at which an answer earns the full length credit.
pub const FULL_LENGTH: usize = 200;
/// Length at which an answer earns the partial length credit.
pub const PARTIAL_LENGTH: usize = 100;

/// A take-home question.
#[derive(Debug)]
pub struct Question {
    pub text: &'static str,
    /// Keywords that must all appear verbatim in the answer.
    pub keywords: &'static [&'static str],
}

impl Question {
    /// Snapshot field name: prefix + text with `？` dropped and spaces as `_`.
    pub fn field_name(&self) -> String {
        format!(
            "{ANSWER_PREFIX}{}",
            self.text.replace('？', "").replace(' ', "_")
        )
    }

    /// Found/missing status of each required keyword, in declared order.
    pub fn keyword_status(&self, answer: &str) -> Vec<(&'static str, bool)> {
        self.keywords
            .iter()
            .map(|kw| (*kw, answer.contains(kw)))
            .collect()
    }

    /// All keywords present. A question without keywords never qualifies.
    pub fn has_all_keywords(&self, answer: &str) -> bool {
        !self.keywords.is_empty() && self.keywords.iter().all(|kw| answer.contains(kw))
    }
}

/// Characters still needed to reach the full length credit, if any.
pub fn remaining_chars(answer: &str) -> Option<usize> {
    let len = answer.chars().count();
    (len < FULL_LENGTH).then(|| FULL_LENGTH - len)
}

/// Identifies one question of one template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QuestionId {
    pub title: ExperimentTitle,
    pub index: usize,
}

impl QuestionId {
    pub fn question(&self) -> &'static Question {
        &required_questions(self.title)[self.index]
    }

    pub fn field_name(&self) -> String {
        self.question().field_name()
    }

    /// Find the question whose field name is `name`, across all titles.
    pub fn from_field_name(name: &str) -> Option<QuestionId> {
        if !name.starts_with(ANSWER_PREFIX) {
            return None;
        }
        ExperimentTitle::ALL.into_iter().find_map(|title| {
            required_questions(title)
                .iter()
                .position(|q| q.field_name() == name)
                .map(|index| QuestionId { title, index })
        })
    }

    /// All question ids of a title, in order.
    pub fn all_for(title: ExperimentTitle) -> impl Iterator<Item = QuestionId> {
        (0..required_questions(title).len()).map(move |index| QuestionId { title, index })
    }
}

static HEAT_QUESTIONS: [Question; 3] = [
    Question {
        text: "熱伝導って何？",
        keywords: &["高温", "低温", "エネルギー"],
    },
    Question {
        text: "固体の中で熱が伝わる仕組みは？",
        keywords: &["原子", "格子振動", "自由電子"],
    },
    Question {
        text: "物質による伝わりやすさの違いは？",
        keywords: &["熱伝導率", "流体", "断熱材"],
    },
];

static FUEL_CELL_QUESTIONS: [Question; 3] = [
    Question {
        text: "アルカリ型燃料電池って何？",
        keywords: &["水素", "アルカリ", "水"],
    },
    Question {
        text: "電池で発電できる仕組みは？",
        keywords: &["材料の反応性の違い", "起電力", "電子やイオンの動き"],
    },
    Question {
        text: "組み立てで大切な工夫は？",
        keywords: &["触媒", "安全上気を付けること"],
    },
];

static WATER_QUESTIONS: [Question; 3] = [
    Question {
        text: "水の利用と機械の関係",
        keywords: &["浄水", "下水", "ポンプ"],
    },
    Question {
        text: "水の汚れとは？水を綺麗にする仕組み",
        keywords: &[],
    },
    Question {
        text: "作製した装置で工夫したポイント",
        keywords: &[],
    },
];

/// The ordered question list of a title.
pub fn required_questions(title: ExperimentTitle) -> &'static [Question] {
    match title {
        ExperimentTitle::HeatConduction => &HEAT_QUESTIONS,
        ExperimentTitle::FuelCell => &FUEL_CELL_QUESTIONS,
        ExperimentTitle::WaterTreatment => &WATER_QUESTIONS,
    }
}
