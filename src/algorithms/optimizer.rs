use nalgebra::DVector;

/// Plain stochastic gradient descent with L2 regularization.
///
/// Every step has the form `param += learning_rate * (error * signal - regularization * param)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sgd {
    learning_rate: f64,
    regularization: f64,
}

impl Sgd {
    pub fn new(learning_rate: f64, regularization: f64) -> Self {
        Self {
            learning_rate,
            regularization,
        }
    }

    pub fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    pub fn regularization(&self) -> f64 {
        self.regularization
    }

    pub fn step_vector(&self, params: &mut DVector<f64>, signal: &DVector<f64>, error: f64) {
        let gradient = signal * error - &*params * self.regularization;
        *params += gradient * self.learning_rate;
    }

    pub fn step_bias(&self, bias: &mut f64, error: f64) {
        *bias += self.learning_rate * (error - self.regularization * *bias);
    }
}
