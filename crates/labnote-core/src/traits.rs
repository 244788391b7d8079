//! Per-title strategy trait.
//!
//! Everything that differs between experiment titles in the rubric is
//! answered by one [`TitleRubric`] implementation, selected with
//! [`rubric_for`](crate::scoring::rubric_for). The report renderer has its own
//! per-title trait for document sections.

use crate::model::ExperimentTitle;
use crate::scoring::Scorecard;
use crate::state::ExperimentState;
use crate::template::{required_questions, Question};

/// Title-specific parts of the completeness rubric.
pub trait TitleRubric: Send + Sync {
    fn title(&self) -> ExperimentTitle;

    /// The ordered take-home questions of this title.
    fn questions(&self) -> &'static [Question] {
        required_questions(self.title())
    }

    /// Whether the methods section has the photo(s) the rubric asks for.
    fn has_apparatus_photo(&self, state: &ExperimentState) -> bool;

    /// Whether the methods section states how results were evaluated.
    fn has_evaluation_method(&self, state: &ExperimentState) -> bool;

    /// Add the 30-point results and discussion block to the scorecard.
    fn score_results(&self, state: &ExperimentState, card: &mut Scorecard);
}
