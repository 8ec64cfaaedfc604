//! Numeric helpers over vectors and short series.

/// Round half away from zero to `places` decimals.
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// Cosine similarity of two vectors. `0.0` when either has zero norm or the lengths differ.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (*x as f64, *y as f64);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation (divides by `n`).
pub fn population_std(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Mean Euclidean distance of each vector from the centroid of all of them.
pub fn mean_centroid_distance(vectors: &[Vec<f32>]) -> f64 {
    let Some(first) = vectors.first() else {
        return 0.0;
    };
    let dims = first.len();
    if dims == 0 || vectors.iter().any(|v| v.len() != dims) {
        return 0.0;
    }

    let mut centroid = vec![0.0f64; dims];
    for vector in vectors {
        for (c, x) in centroid.iter_mut().zip(vector) {
            *c += *x as f64;
        }
    }
    let n = vectors.len() as f64;
    centroid.iter_mut().for_each(|c| *c /= n);

    let total: f64 = vectors
        .iter()
        .map(|vector| {
            vector
                .iter()
                .zip(&centroid)
                .map(|(x, c)| (*x as f64 - c).powi(2))
                .sum::<f64>()
                .sqrt()
        })
        .sum();
    total / n
}

/// Largest DFT magnitude over frequency bins `1..n`, skipping the DC bin.
pub fn dominant_oscillation(series: &[f64]) -> f64 {
    let n = series.len();
    if n < 2 {
        return 0.0;
    }
    (1..n)
        .map(|k| {
            let (mut re, mut im) = (0.0f64, 0.0f64);
            for (t, x) in series.iter().enumerate() {
                let angle = -2.0 * std::f64::consts::PI * (k * t) as f64 / n as f64;
                re += x * angle.cos();
                im += x * angle.sin();
            }
            (re * re + im * im).sqrt()
        })
        .fold(0.0, f64::max)
}

/// Shannon entropy in bits of a frequency table.
pub fn shannon_entropy_bits(counts: impl IntoIterator<Item = usize>) -> f64 {
    let counts: Vec<usize> = counts.into_iter().filter(|c| *c > 0).collect();
    let total: usize = counts.iter().sum();
    if total == 0 {
        return 0.0;
    }
    let total = total as f64;
    -counts
        .iter()
        .map(|c| {
            let p = *c as f64 / total;
            p * p.log2()
        })
        .sum::<f64>()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn cosine_of_parallel_and_orthogonal_vectors() {
        assert!(close(cosine_similarity(&[1.0, 2.0], &[2.0, 4.0]), 1.0));
        assert!(close(cosine_similarity(&[1.0, 0.0], &[0.0, 3.0]), 0.0));
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 1.0]), 0.0);
    }

    #[test]
    fn std_is_population_std() {
        assert!(close(population_std(&[1.0, 3.0]), 1.0));
        assert!(close(population_std(&[2.0, 2.0, 2.0]), 0.0));
    }

    #[test]
    fn centroid_distance_of_two_points_is_half_their_gap() {
        let vectors = vec![vec![0.0, 0.0], vec![6.0, 8.0]];
        assert!(close(mean_centroid_distance(&vectors), 5.0));
    }

    #[test]
    fn oscillation_of_alternating_series() {
        // X_1 of [1, -1] is 2, X_0 is excluded.
        assert!(close(dominant_oscillation(&[1.0, -1.0]), 2.0));
        assert!(close(dominant_oscillation(&[0.5, 0.5, 0.5, 0.5]), 0.0));
        assert_eq!(dominant_oscillation(&[0.9]), 0.0);
    }

    #[test]
    fn entropy_in_bits() {
        assert!(close(shannon_entropy_bits([1, 1]), 1.0));
        assert!(close(shannon_entropy_bits([4]), 0.0));
        assert!(close(shannon_entropy_bits([1, 1, 1, 1]), 2.0));
        assert_eq!(shannon_entropy_bits(Vec::<usize>::new()), 0.0);
    }

    #[test]
    fn rounding() {
        assert_eq!(round_to(1.23456, 3), 1.235);
        assert_eq!(round_to(0.5, 0), 1.0);
    }
}
