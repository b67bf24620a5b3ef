//! Lesson statistics shown at completion and on demand.

use serde::Serialize;

use super::evaluator::CONFIDENCE_CORRECT;
use super::LessonProgress;
use crate::domain::foundation::Timestamp;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LessonStats {
    pub learned: usize,
    pub already_known: usize,
    pub drilled: usize,
    pub words_per_lesson: usize,
    pub well_answered: usize,
    pub retried: usize,
    /// Percentage of drilled words answered correctly.
    pub accuracy: f64,
    pub duration_secs: i64,
    pub words: Vec<(String, String, u8)>,
}

impl LessonStats {
    pub fn from_progress(progress: &LessonProgress, now: Timestamp) -> Self {
        let well_answered = progress
            .words_learned
            .iter()
            .filter(|w| !w.already_known && w.confidence_score >= CONFIDENCE_CORRECT)
            .count();
        let drilled = progress.drilled_count();
        let accuracy = if drilled == 0 {
            0.0
        } else {
            well_answered as f64 / drilled as f64 * 100.0
        };

        Self {
            learned: progress.learned_count as usize,
            already_known: progress.already_known_count as usize,
            drilled,
            words_per_lesson: progress.words_per_lesson(),
            well_answered,
            retried: progress.retry_words.len(),
            accuracy,
            duration_secs: now.duration_since(&progress.start_time).num_seconds().max(0),
            words: progress
                .words_learned
                .iter()
                .map(|w| (w.word.clone(), w.translation.clone(), w.confidence_score))
                .collect(),
        }
    }

    pub fn render(&self) -> String {
        let mut text = format!(
            "📊 Progress: {}/{} words\n✅ Answered well: {}\n💡 Already known: {}\n🎯 Accuracy: {:.0}%\n⏱ Time: {} min {} s",
            self.drilled,
            self.words_per_lesson,
            self.well_answered,
            self.already_known,
            self.accuracy,
            self.duration_secs / 60,
            self.duration_secs % 60,
        );
        if !self.words.is_empty() {
            text.push_str("\n\nWords:");
            for (word, translation, confidence) in &self.words {
                text.push_str(&format!("\n• {} - {} ({}%)", word, translation, confidence));
            }
        }
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::lesson::progress::test_support::*;
    use crate::domain::lesson::{next_word_set, Answer};

    #[test]
    fn accuracy_is_over_drilled_words_only() {
        let mut progress = LessonProgress::new(lesson(3, 6));
        let set = next_word_set(&progress).unwrap();
        progress.begin_set(set).unwrap();
        progress.mark_already_known(0, &progress.words_in_current_set[0].word_id.clone()).unwrap();
        progress.record_answer(&correct(&progress)).unwrap();
        progress.record_answer(&wrong()).unwrap();
        progress.record_answer(&Answer::Skip).unwrap();

        let stats = LessonStats::from_progress(&progress, progress.start_time.plus_secs(125));
        assert_eq!(stats.learned, 4);
        assert_eq!(stats.already_known, 1);
        assert_eq!(stats.drilled, 3);
        assert_eq!(stats.well_answered, 1);
        assert!((stats.accuracy - 100.0 / 3.0).abs() < 1e-9);
        assert_eq!(stats.duration_secs, 125);

        let text = stats.render();
        assert!(text.contains("3/3"));
        assert!(text.contains("2 min 5 s"));
    }

    #[test]
    fn empty_lesson_has_zero_accuracy() {
        let progress = LessonProgress::new(lesson(3, 3));
        let stats = LessonStats::from_progress(&progress, progress.start_time);
        assert_eq!(stats.accuracy, 0.0);
        assert!(stats.words.is_empty());
    }
}
