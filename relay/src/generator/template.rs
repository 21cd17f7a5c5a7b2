/// Synthetic square-wave voltammogram: a Gaussian peak of `peak_height`
/// centred at `center` volts on a sloped baseline.
pub struct Voltammogram {
    pub potentials: Vec<f64>,
    pub currents: Vec<f64>,
    pub baseline: Vec<f64>,
}

pub fn voltammogram(points: usize, peak_height: f64, center: f64, width: f64) -> Voltammogram {
    let points = points.max(2);
    let (start, end) = (-0.5, 0.1);
    let step = (end - start) / (points - 1) as f64;
    let width = width.max(f64::EPSILON);

    let potentials: Vec<f64> = (0..points).map(|i| start + i as f64 * step).collect();
    let baseline: Vec<f64> = potentials.iter().map(|&v| 0.2e-6 + 0.1e-6 * (v - start)).collect();
    let currents = potentials
        .iter()
        .zip(&baseline)
        .map(|(&v, &b)| b + peak_height * (-((v - center) / width).powi(2) / 2.0).exp())
        .collect();

    Voltammogram {
        potentials,
        currents,
        baseline,
    }
}
