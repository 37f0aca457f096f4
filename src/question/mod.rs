// Public API
pub use models::{AnswerOption, DrawnQuestion, QuestionRecord};
pub use supplier::{InMemoryQuestionSupplier, QuestionSupplier};

// Internal modules
mod models;
mod supplier;
