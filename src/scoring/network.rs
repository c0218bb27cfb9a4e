//! Network scorer: one of the four dimensions fused into a process verdict.
//! Flags connections to known mining-pool stratum ports.

use crate::proc::enumerate::NetworkConnection;

use super::DimensionScore;

const KNOWN_POOL_PORTS: &[u16] = &[3333, 4444, 5555, 7777, 8888, 9999, 14444, 3032];
const CONFIDENCE_FACTOR: f64 = 0.9;

pub fn score(connections: &[NetworkConnection]) -> DimensionScore {
    let mut score = 0.0;
    let mut evidence = Vec::new();

    for conn in connections {
        if KNOWN_POOL_PORTS.contains(&conn.remote_port) {
            score += 0.6;
            evidence.push(format!("connection to known mining pool port {}", conn.remote_port));
        }
    }
    if connections.len() > 5 {
        score += 0.2;
        evidence.push(format!("{} concurrent connections", connections.len()));
    }

    DimensionScore::capped(score, CONFIDENCE_FACTOR, evidence)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_port_connection_contributes_fixed_score() {
        let conns = [NetworkConnection { remote_port: 3333 }];
        let result = score(&conns);
        assert!((result.score - 0.6).abs() < 1e-9);
        assert!((result.confidence - 0.54).abs() < 1e-9);
    }

    #[test]
    fn many_connections_add_extra_contribution() {
        let conns: Vec<_> = (0..6).map(|_| NetworkConnection { remote_port: 80 }).collect();
        let result = score(&conns);
        assert!((result.score - 0.2).abs() < 1e-9);
    }

    #[test]
    fn score_caps_at_one() {
        let conns: Vec<_> = (0..6).map(|_| NetworkConnection { remote_port: 3333 }).collect();
        let result = score(&conns);
        assert_eq!(result.score, 1.0);
    }

    #[test]
    fn no_connections_scores_zero() {
        assert_eq!(score(&[]).score, 0.0);
    }
}
