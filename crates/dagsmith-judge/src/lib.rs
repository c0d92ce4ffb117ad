mod evaluation;
pub mod evaluator;
mod gate;
mod prompts;

pub use evaluation::{parse_judgment, Evaluation, JudgmentParseError, PASS_THRESHOLD};
pub use evaluator::{AgentEvaluator, Evaluator, ScoringError};
pub use gate::QualityGate;
pub use prompts::{JudgePrompts, MAX_JUDGED_CODE_LEN};
