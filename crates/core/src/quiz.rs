use crate::model::QuizQuestion;

/// Minimum share of correct answers, in percent, for a quiz page to count as done.
pub const PASS_THRESHOLD_PERCENT: usize = 70;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuizScore {
    pub correct: usize,
    pub total: usize,
}

impl QuizScore {
    /// An empty quiz passes.
    #[must_use]
    pub fn passed(&self) -> bool {
        self.correct * 100 >= PASS_THRESHOLD_PERCENT * self.total
    }
}

/// Score submitted option indices against a quiz page's questions.
///
/// `answers[i]` answers `questions[i]`; unanswered questions count as wrong.
#[must_use]
pub fn grade(questions: &[QuizQuestion], answers: &[usize]) -> QuizScore {
    let correct = questions
        .iter()
        .zip(answers)
        .filter(|(question, answer)| question.correct_answer == **answer)
        .count();
    QuizScore {
        correct,
        total: questions.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn questions(n: usize) -> Vec<QuizQuestion> {
        (0..n)
            .map(|i| QuizQuestion {
                id: format!("q{i}"),
                question: format!("Question {i}"),
                options: vec!["a".into(), "b".into()],
                correct_answer: 1,
            })
            .collect()
    }

    #[test]
    fn seventy_percent_passes() {
        let qs = questions(10);
        let mut answers = vec![1; 7];
        answers.extend([0; 3]);
        let score = grade(&qs, &answers);
        assert_eq!(score, QuizScore { correct: 7, total: 10 });
        assert!(score.passed());
    }

    #[test]
    fn below_threshold_fails() {
        let qs = questions(3);
        let score = grade(&qs, &[1, 1, 0]);
        assert_eq!(score.correct, 2);
        assert!(!score.passed());
    }

    #[test]
    fn missing_answers_count_as_wrong() {
        let score = grade(&questions(4), &[1]);
        assert_eq!(score, QuizScore { correct: 1, total: 4 });
    }

    #[test]
    fn empty_quiz_passes() {
        assert!(grade(&[], &[]).passed());
    }
}
