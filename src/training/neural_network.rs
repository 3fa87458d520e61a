//! Feed-forward regression network
//!
//! A small multi-layer perceptron with named dense layers, trained with
//! mini-batch gradient descent and momentum on a mean-squared-error loss.
//! Layer names make warm starts from a prior model explicit: weights are
//! transferred only where both the name and the shape match.

use crate::error::{LoanflowError, Result};
use ndarray::{Array1, Array2, Axis};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

/// Network configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MLPConfig {
    /// Hidden layer widths
    pub hidden_layers: Vec<usize>,
    /// Learning rate
    pub learning_rate: f64,
    /// Number of epochs
    pub max_epochs: usize,
    /// Mini-batch size
    pub batch_size: usize,
    /// L2 regularization
    pub alpha: f64,
    /// Random seed
    pub random_state: Option<u64>,
    /// Early stopping patience, in epochs
    pub early_stopping_patience: usize,
    /// Fraction of training data held out for early stopping
    pub validation_split: f64,
    /// Momentum
    pub momentum: f64,
}

impl Default for MLPConfig {
    fn default() -> Self {
        Self {
            hidden_layers: vec![64, 32],
            learning_rate: 0.001,
            max_epochs: 50,
            batch_size: 32,
            alpha: 0.0001,
            random_state: Some(42),
            early_stopping_patience: 10,
            validation_split: 0.1,
            momentum: 0.9,
        }
    }
}

/// One named dense layer
#[derive(Debug, Clone, Serialize, Deserialize)]
struct DenseLayer {
    name: String,
    weights: Array2<f64>,
    biases: Array1<f64>,
}

/// Multi-layer perceptron regressor with a single scalar output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MLPRegressor {
    config: MLPConfig,
    layers: Vec<DenseLayer>,
    n_features: usize,
    is_fitted: bool,
    /// Prior-model layers to transfer from on the next fit
    #[serde(skip)]
    warm_start: Option<Vec<DenseLayer>>,
}

impl MLPRegressor {
    pub fn new(config: MLPConfig) -> Self {
        Self {
            config,
            layers: Vec::new(),
            n_features: 0,
            is_fitted: false,
            warm_start: None,
        }
    }

    /// Transfer compatible-layer weights from a prior model on the next fit.
    pub fn with_warm_start(mut self, prior: &MLPRegressor) -> Self {
        self.warm_start = Some(prior.layers.clone());
        self
    }

    /// Fit the model
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        let n_samples = x.nrows();
        if n_samples == 0 || n_samples != y.len() {
            return Err(LoanflowError::TrainingError(format!(
                "bad training shapes: {} rows vs {} targets",
                n_samples,
                y.len()
            )));
        }
        self.n_features = x.ncols();

        self.initialize_layers();
        if let Some(prior_layers) = self.warm_start.take() {
            self.transfer_weights(&prior_layers);
        }

        let mut rng = match self.config.random_state {
            Some(seed) => Xoshiro256PlusPlus::seed_from_u64(seed),
            None => Xoshiro256PlusPlus::from_entropy(),
        };

        // Hold out the tail for early stopping
        let val_size = (n_samples as f64 * self.config.validation_split) as usize;
        let train_size = n_samples - val_size;

        let x_train = x.slice(ndarray::s![..train_size, ..]).to_owned();
        let y_train = y.slice(ndarray::s![..train_size]).to_owned();
        let x_val = x.slice(ndarray::s![train_size.., ..]).to_owned();
        let y_val = y.slice(ndarray::s![train_size..]).to_owned();

        let mut velocities_w: Vec<Array2<f64>> = self
            .layers
            .iter()
            .map(|l| Array2::zeros(l.weights.raw_dim()))
            .collect();
        let mut velocities_b: Vec<Array1<f64>> = self
            .layers
            .iter()
            .map(|l| Array1::zeros(l.biases.len()))
            .collect();

        let mut best_val_loss = f64::INFINITY;
        let mut patience_counter = 0;

        for _epoch in 0..self.config.max_epochs {
            let mut indices: Vec<usize> = (0..train_size).collect();
            indices.shuffle(&mut rng);

            for batch_start in (0..train_size).step_by(self.config.batch_size) {
                let batch_end = (batch_start + self.config.batch_size).min(train_size);
                let batch_indices = &indices[batch_start..batch_end];

                let x_batch = gather_rows(&x_train, batch_indices);
                let y_batch: Array1<f64> = batch_indices.iter().map(|&i| y_train[i]).collect();

                let (activations, z_values) = self.forward(&x_batch);
                let gradients = self.backward(&y_batch, &activations, &z_values);

                for (i, (grad_w, grad_b)) in gradients.into_iter().enumerate() {
                    velocities_w[i] = &velocities_w[i] * self.config.momentum
                        - &grad_w * self.config.learning_rate;
                    velocities_b[i] = &velocities_b[i] * self.config.momentum
                        - &grad_b * self.config.learning_rate;

                    self.layers[i].weights = &self.layers[i].weights + &velocities_w[i];
                    self.layers[i].biases = &self.layers[i].biases + &velocities_b[i];

                    // L2 weight decay
                    self.layers[i].weights = &self.layers[i].weights
                        * (1.0 - self.config.alpha * self.config.learning_rate);
                }
            }

            if val_size > 0 {
                let val_pred = self.forward_predict(&x_val);
                let val_loss = mse(&y_val, &val_pred);

                if val_loss < best_val_loss {
                    best_val_loss = val_loss;
                    patience_counter = 0;
                } else {
                    patience_counter += 1;
                    if patience_counter >= self.config.early_stopping_patience {
                        break;
                    }
                }
            }
        }

        self.is_fitted = true;
        Ok(())
    }

    /// Predict one continuous estimate per row.
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if !self.is_fitted {
            return Err(LoanflowError::NotFitted);
        }
        if x.ncols() != self.n_features {
            return Err(LoanflowError::DataError(format!(
                "expected {} features, got {}",
                self.n_features,
                x.ncols()
            )));
        }
        Ok(self.forward_predict(x))
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn is_fitted(&self) -> bool {
        self.is_fitted
    }

    /// Layer names in forward order.
    pub fn layer_names(&self) -> Vec<&str> {
        self.layers.iter().map(|l| l.name.as_str()).collect()
    }

    /// Serialize the trained model to a JSON artifact.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string(self)?;
        std::fs::write(path.as_ref(), json).map_err(|e| {
            LoanflowError::ArtifactError(format!(
                "cannot write model artifact {}: {e}",
                path.as_ref().display()
            ))
        })
    }

    /// Load a trained model artifact. A missing or corrupt file is fatal.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            LoanflowError::ArtifactError(format!(
                "cannot read model artifact {}: {e}",
                path.as_ref().display()
            ))
        })?;
        let model: Self = serde_json::from_str(&json).map_err(|e| {
            LoanflowError::ArtifactError(format!(
                "corrupt model artifact {}: {e}",
                path.as_ref().display()
            ))
        })?;
        if !model.is_fitted {
            return Err(LoanflowError::ArtifactError(format!(
                "model artifact {} was never fitted",
                path.as_ref().display()
            )));
        }
        Ok(model)
    }

    /// Xavier-initialized layers named dense_1, dense_2, ..., output.
    fn initialize_layers(&mut self) {
        self.layers.clear();

        let mut rng = match self.config.random_state {
            Some(seed) => Xoshiro256PlusPlus::seed_from_u64(seed),
            None => Xoshiro256PlusPlus::from_entropy(),
        };

        let mut layer_sizes = vec![self.n_features];
        layer_sizes.extend(&self.config.hidden_layers);
        layer_sizes.push(1); // single scalar output

        for i in 0..layer_sizes.len() - 1 {
            let n_in = layer_sizes[i];
            let n_out = layer_sizes[i + 1];

            let scale = (2.0 / (n_in + n_out) as f64).sqrt();
            let weights: Vec<f64> = (0..n_in * n_out)
                .map(|_| rng.gen::<f64>() * 2.0 * scale - scale)
                .collect();

            let name = if i == layer_sizes.len() - 2 {
                "output".to_string()
            } else {
                format!("dense_{}", i + 1)
            };

            self.layers.push(DenseLayer {
                name,
                weights: Array2::from_shape_vec((n_in, n_out), weights).unwrap(),
                biases: Array1::zeros(n_out),
            });
        }
    }

    /// Copy weights from prior layers where name and shape match; anything
    /// else keeps its fresh initialization.
    fn transfer_weights(&mut self, prior_layers: &[DenseLayer]) {
        for layer in &mut self.layers {
            match prior_layers.iter().find(|p| p.name == layer.name) {
                Some(prior) if prior.weights.raw_dim() == layer.weights.raw_dim() => {
                    layer.weights = prior.weights.clone();
                    layer.biases = prior.biases.clone();
                    info!(layer = %layer.name, "weights transferred from prior model");
                }
                Some(_) => {
                    warn!(layer = %layer.name, "incompatible shape, layer reinitialized");
                }
                None => {
                    warn!(layer = %layer.name, "no matching prior layer, layer reinitialized");
                }
            }
        }
    }

    fn forward(&self, x: &Array2<f64>) -> (Vec<Array2<f64>>, Vec<Array2<f64>>) {
        let mut activations = vec![x.clone()];
        let mut z_values = Vec::new();

        for (i, layer) in self.layers.iter().enumerate() {
            let z = activations.last().unwrap().dot(&layer.weights) + &layer.biases;
            z_values.push(z.clone());

            let a = if i < self.layers.len() - 1 {
                relu(&z)
            } else {
                z // linear output for regression
            };
            activations.push(a);
        }

        (activations, z_values)
    }

    fn forward_predict(&self, x: &Array2<f64>) -> Array1<f64> {
        let (activations, _) = self.forward(x);
        activations.last().unwrap().column(0).to_owned()
    }

    fn backward(
        &self,
        y: &Array1<f64>,
        activations: &[Array2<f64>],
        z_values: &[Array2<f64>],
    ) -> Vec<(Array2<f64>, Array1<f64>)> {
        let n = y.len() as f64;
        let mut gradients = Vec::new();

        // Output layer error (MSE gradient)
        let y_2d = y.clone().insert_axis(Axis(1));
        let output = activations.last().unwrap();
        let mut delta = (output - &y_2d) / n;

        for i in (0..self.layers.len()).rev() {
            let a_prev = &activations[i];

            let grad_w = a_prev.t().dot(&delta);
            let grad_b = delta.sum_axis(Axis(0));
            gradients.push((grad_w, grad_b));

            if i > 0 {
                let z = &z_values[i - 1];
                delta = delta.dot(&self.layers[i].weights.t()) * relu_derivative(z);
            }
        }

        gradients.reverse();
        gradients
    }
}

fn relu(z: &Array2<f64>) -> Array2<f64> {
    z.mapv(|v| v.max(0.0))
}

fn relu_derivative(z: &Array2<f64>) -> Array2<f64> {
    z.mapv(|v| if v > 0.0 { 1.0 } else { 0.0 })
}

fn gather_rows(x: &Array2<f64>, indices: &[usize]) -> Array2<f64> {
    let n_cols = x.ncols();
    let mut rows = Vec::with_capacity(indices.len() * n_cols);
    for &i in indices {
        rows.extend(x.row(i).iter().copied());
    }
    Array2::from_shape_vec((indices.len(), n_cols), rows).unwrap()
}

fn mse(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> f64 {
    y_true
        .iter()
        .zip(y_pred.iter())
        .map(|(t, p)| (t - p).powi(2))
        .sum::<f64>()
        / y_true.len() as f64
}
