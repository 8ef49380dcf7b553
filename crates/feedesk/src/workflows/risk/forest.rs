use smartcore::ensemble::random_forest_classifier::{
    RandomForestClassifier, RandomForestClassifierParameters,
};
use smartcore::linalg::basic::arrays::Array;
use smartcore::linalg::basic::matrix::DenseMatrix;

use super::ModelPrerequisiteError;

/// Hyper-parameters handed to the random forest classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForestParams {
    pub trees: u16,
    pub max_depth: u16,
    pub min_samples_split: usize,
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            trees: 200,
            max_depth: 8,
            min_samples_split: 2,
            seed: 42,
        }
    }
}

impl ForestParams {
    fn classifier_parameters(&self) -> RandomForestClassifierParameters {
        RandomForestClassifierParameters::default()
            .with_n_trees(self.trees.max(1))
            .with_max_depth(self.max_depth)
            .with_min_samples_split(self.min_samples_split)
            .with_seed(self.seed)
    }
}

type Classifier = RandomForestClassifier<f64, u32, DenseMatrix<f64>, Vec<u32>>;

/// Fitted model. A training set holding a single class has nothing to split on, so it
/// predicts that class with certainty.
pub(crate) enum RandomForest {
    Fitted(Box<Classifier>),
    Constant(f64),
}

fn matrix(rows: &[Vec<f64>]) -> Result<DenseMatrix<f64>, ModelPrerequisiteError> {
    DenseMatrix::from_2d_vec(&rows.to_vec()).map_err(training_failed)
}

fn training_failed(err: smartcore::error::Failed) -> ModelPrerequisiteError {
    ModelPrerequisiteError::Training {
        reason: err.to_string(),
    }
}

impl RandomForest {
    pub(crate) fn fit(
        rows: &[Vec<f64>],
        labels: &[bool],
        params: &ForestParams,
    ) -> Result<Self, ModelPrerequisiteError> {
        let positives = labels.iter().filter(|&&label| label).count();
        if positives == 0 || positives == labels.len() {
            return Ok(Self::Constant(if positives == 0 { 0.0 } else { 1.0 }));
        }

        let x = matrix(rows)?;
        let y = labels.iter().map(|&label| u32::from(label)).collect::<Vec<_>>();
        let model = Classifier::fit(&x, &y, params.classifier_parameters())
            .map_err(training_failed)?;
        Ok(Self::Fitted(Box::new(model)))
    }

    /// Positive-class probability per row. Both classes were seen in training, so the
    /// probability columns are `[0, 1]` in label order.
    pub(crate) fn predict_proba(
        &self,
        rows: &[Vec<f64>],
    ) -> Result<Vec<f64>, ModelPrerequisiteError> {
        match self {
            Self::Constant(probability) => Ok(vec![*probability; rows.len()]),
            Self::Fitted(model) => {
                let probabilities = model
                    .predict_proba(&matrix(rows)?)
                    .map_err(training_failed)?;
                Ok((0..rows.len())
                    .map(|row| *probabilities.get((row, 1)))
                    .collect())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn separable() -> (Vec<Vec<f64>>, Vec<bool>) {
        let rows = (0..40)
            .map(|i| vec![f64::from(i % 5), 1.0])
            .collect::<Vec<_>>();
        let labels = rows.iter().map(|row| row[0] >= 2.0).collect();
        (rows, labels)
    }

    #[test]
    fn learns_a_separable_threshold() {
        let (rows, labels) = separable();
        let forest = RandomForest::fit(&rows, &labels, &ForestParams::default()).expect("fits");
        let scores = forest
            .predict_proba(&[vec![4.0, 1.0], vec![0.0, 1.0]])
            .expect("predicts");
        assert!(scores[0] > 0.5);
        assert!(scores[1] < 0.5);
    }

    #[test]
    fn fixed_seed_is_reproducible() {
        let (rows, labels) = separable();
        let params = ForestParams {
            trees: 25,
            ..ForestParams::default()
        };
        let first = RandomForest::fit(&rows, &labels, &params).expect("fits");
        let second = RandomForest::fit(&rows, &labels, &params).expect("fits");
        assert_eq!(
            first.predict_proba(&rows).expect("predicts"),
            second.predict_proba(&rows).expect("predicts")
        );
    }

    #[test]
    fn probabilities_stay_in_unit_interval() {
        let (rows, labels) = separable();
        let forest = RandomForest::fit(&rows, &labels, &ForestParams::default()).expect("fits");
        assert!(forest
            .predict_proba(&rows)
            .expect("predicts")
            .iter()
            .all(|score| (0.0..=1.0).contains(score)));
    }

    #[test]
    fn single_class_training_gives_constant_probability() {
        let rows = vec![vec![1.0], vec![2.0], vec![3.0]];
        let forest = RandomForest::fit(&rows, &[false, false, false], &ForestParams::default())
            .expect("fits");
        assert_eq!(
            forest.predict_proba(&[vec![10.0]]).expect("predicts"),
            vec![0.0]
        );
    }
}
