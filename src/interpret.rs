use std::sync::Arc;
use tracing::{debug, info};

use crate::classifier::{top_label, ZeroShotClassifier};
use crate::error::{RecommendError, RecommendResult};
use crate::models::FilterSet;
use crate::taxonomy::{Duration, Era, Taxonomy};

/// Maps free text onto the taxonomy, one classification per dimension.
#[derive(Clone)]
pub struct PreferenceInterpreter {
    classifier: Arc<dyn ZeroShotClassifier>,
}

impl PreferenceInterpreter {
    /// `classifier` must already be warmed up.
    pub fn new(classifier: Arc<dyn ZeroShotClassifier>) -> Self {
        Self { classifier }
    }

    pub async fn interpret(&self, text: &str, taxonomy: &Taxonomy) -> RecommendResult<FilterSet> {
        let genres = taxonomy.genre_labels();
        let durations: Vec<String> = Duration::ALL.iter().map(|d| d.label().to_string()).collect();
        let languages = taxonomy.language_names();
        let eras: Vec<String> = Era::ALL.iter().map(|e| e.label().to_string()).collect();

        let classifier = self.classifier.as_ref();
        let (genre, duration, language, era) = tokio::try_join!(
            top_label(classifier, text, &genres),
            top_label(classifier, text, &durations),
            top_label(classifier, text, &languages),
            top_label(classifier, text, &eras),
        )?;
        debug!(%genre, %duration, %language, %era, "Raw classifier picks");

        let language = taxonomy.language_code(&language).ok_or_else(|| {
            RecommendError::ClassificationUnavailable(format!(
                "classifier chose a label outside the language set: {language}"
            ))
        })?;

        let filters = FilterSet::from_labels(&genre, &duration, language, &era);
        info!(
            genre = %filters.genre,
            duration = ?filters.duration,
            language = %filters.language,
            era = ?filters.era,
            "Interpreted preferences"
        );
        Ok(filters)
    }
}
