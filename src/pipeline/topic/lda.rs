//! Latent Dirichlet Allocation fitted with batch variational Bayes.
//!
//! Each pass runs the per-document E-step over the whole corpus and then
//! replaces the topic-term parameters in one M-step.
use ndarray::{Array1, Array2, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use super::dictionary::BagOfWords;

/// Keeps `phinorm` away from zero.
const PHINORM_EPSILON: f64 = 1e-100;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LdaParams {
    pub num_topics: usize,
    pub passes: usize,
    pub iterations: usize,
    /// Mean absolute change of gamma below which the E-step stops early.
    pub gamma_threshold: f64,
    pub seed: u64,
}

#[derive(Debug, Clone)]
pub struct LdaModel {
    alpha: f64,
    iterations: usize,
    gamma_threshold: f64,
    /// topics x terms
    lambda: Array2<f64>,
    /// exp(E[log beta]) of `lambda`; recomputed whenever `lambda` changes
    exp_elog_beta: Array2<f64>,
}

impl LdaModel {
    /// Fits the model. `num_terms` must be the dictionary size and every id in
    /// `corpus` must be below it.
    #[must_use]
    pub fn fit(corpus: &[BagOfWords], num_terms: usize, params: &LdaParams) -> Self {
        let num_topics = params.num_topics.max(1);
        #[allow(clippy::cast_precision_loss)]
        let prior = 1.0 / num_topics as f64;

        let mut rng = StdRng::seed_from_u64(params.seed);
        let lambda = Array2::from_shape_fn((num_topics, num_terms), |_| {
            rng.random_range(0.9..1.1)
        });

        let mut model = Self::from_lambda(
            prior,
            params.iterations.max(1),
            params.gamma_threshold,
            lambda,
        );

        for _ in 0..params.passes {
            // E-step
            let thetas: Vec<Option<Array1<f64>>> = corpus
                .par_iter()
                .map(|bow| {
                    if bow.is_empty() {
                        None
                    } else {
                        Some(model.infer(bow).1)
                    }
                })
                .collect();

            let mut sstats = Array2::<f64>::zeros((num_topics, num_terms));
            for (bow, theta) in corpus.iter().zip(&thetas) {
                let Some(exp_elog_theta) = theta else {
                    continue;
                };
                for &(id, count) in bow {
                    let column = model.exp_elog_beta.column(id);
                    let phinorm = exp_elog_theta.dot(&column) + PHINORM_EPSILON;
                    let weight = f64::from(count) / phinorm;
                    for topic in 0..num_topics {
                        sstats[[topic, id]] += exp_elog_theta[topic] * weight;
                    }
                }
            }

            // M-step
            sstats *= &model.exp_elog_beta;
            model.set_lambda(sstats.mapv(|value| value + prior));
        }

        model
    }

    fn from_lambda(alpha: f64, iterations: usize, gamma_threshold: f64, lambda: Array2<f64>) -> Self {
        let exp_elog_beta = exp_elog_beta(&lambda);
        Self {
            alpha,
            iterations,
            gamma_threshold,
            lambda,
            exp_elog_beta,
        }
    }

    fn set_lambda(&mut self, lambda: Array2<f64>) {
        self.exp_elog_beta = exp_elog_beta(&lambda);
        self.lambda = lambda;
    }

    #[must_use]
    pub fn num_topics(&self) -> usize {
        self.lambda.nrows()
    }

    /// Normalised topic mixture of one document, keeping topics whose
    /// probability is at least `minimum_probability`. Empty for an empty
    /// bag-of-words.
    #[must_use]
    pub fn document_topics(&self, bow: &BagOfWords, minimum_probability: f64) -> Vec<(usize, f64)> {
        if bow.is_empty() {
            return Vec::new();
        }

        let (gamma, _) = self.infer(bow);
        let total = gamma.sum();
        if total <= 0.0 || !total.is_finite() {
            return Vec::new();
        }

        gamma
            .iter()
            .enumerate()
            .map(|(topic, value)| (topic, value / total))
            .filter(|(_, probability)| *probability >= minimum_probability)
            .collect()
    }

    /// `(term_id, weight)` of the `topn` heaviest terms of `topic`,
    /// heaviest first; equal weights keep the lower id first.
    #[must_use]
    pub fn top_terms(&self, topic: usize, topn: usize) -> Vec<(usize, f64)> {
        if topic >= self.num_topics() {
            return Vec::new();
        }
        let row = self.lambda.row(topic);
        let total = row.sum();
        let mut weights: Vec<(usize, f64)> = row
            .iter()
            .enumerate()
            .map(|(id, value)| (id, value / total))
            .collect();
        // stable sort keeps id order among ties
        weights.sort_by(|a, b| b.1.total_cmp(&a.1));
        weights.truncate(topn);
        weights
    }

    /// Variational inference for one document. Returns `(gamma, exp(E[log theta]))`.
    fn infer(&self, bow: &BagOfWords) -> (Array1<f64>, Array1<f64>) {
        let num_topics = self.num_topics();
        let mut gamma = Array1::<f64>::ones(num_topics);
        let mut exp_elog_theta = exp_dirichlet_expectation(&gamma);

        for _ in 0..self.iterations {
            let previous = gamma.clone();

            let mut next = Array1::from_elem(num_topics, self.alpha);
            for &(id, count) in bow {
                let column = self.exp_elog_beta.column(id);
                let phinorm = exp_elog_theta.dot(&column) + PHINORM_EPSILON;
                let weight = f64::from(count) / phinorm;
                for topic in 0..num_topics {
                    next[topic] += exp_elog_theta[topic] * column[topic] * weight;
                }
            }

            gamma = next;
            exp_elog_theta = exp_dirichlet_expectation(&gamma);

            let mean_change = (&gamma - &previous)
                .mapv(f64::abs)
                .mean()
                .unwrap_or(0.0);
            if mean_change < self.gamma_threshold {
                break;
            }
        }

        (gamma, exp_elog_theta)
    }
}

fn exp_elog_beta(lambda: &Array2<f64>) -> Array2<f64> {
    let mut expectation = lambda.clone();
    for mut row in expectation.axis_iter_mut(Axis(0)) {
        let psi_total = digamma(row.sum());
        row.mapv_inplace(|value| (digamma(value) - psi_total).exp());
    }
    expectation
}

fn exp_dirichlet_expectation(alpha: &Array1<f64>) -> Array1<f64> {
    let psi_total = digamma(alpha.sum());
    alpha.mapv(|value| (digamma(value) - psi_total).exp())
}

/// Digamma for positive arguments: recurrence up to 6, then the asymptotic series.
pub(crate) fn digamma(mut x: f64) -> f64 {
    let mut result = 0.0;
    while x < 6.0 {
        result -= 1.0 / x;
        x += 1.0;
    }
    let inv = 1.0 / x;
    let inv2 = inv * inv;
    result + x.ln()
        - 0.5 * inv
        - inv2
            * (1.0 / 12.0
                - inv2 * (1.0 / 120.0 - inv2 * (1.0 / 252.0 - inv2 * (1.0 / 240.0 - inv2 / 132.0))))
}
