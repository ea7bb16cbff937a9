// services/scoring.rs
//
// Deterministic rule-based ranking over discovery candidates. Pure functions
// only: same inputs, same score, no I/O, so the whole module is testable
// without a database.
use chrono::{DateTime, Duration, Utc};
use num_traits::ToPrimitive;
use serde::{Deserialize, Serialize};

use crate::models::actormodel::ActorProfile;
use crate::models::gigmodel::Gig;

const GENRE_WEIGHT: f32 = 30.0;
const DISTANCE_WEIGHT: f32 = 30.0;
const PRICE_FULL_BONUS: f32 = 20.0;
const PRICE_PARTIAL_BONUS: f32 = 10.0;
const REPUTATION_WEIGHT: f32 = 15.0;
const RECENCY_BONUS: f32 = 5.0;
const RECENCY_WINDOW_DAYS: i64 = 3;
const MAX_SCORE: f32 = 100.0;

/// The swiping actor's effective attributes after filter defaulting.
#[derive(Debug, Clone)]
pub struct ScorerProfile {
    pub genres: Vec<String>,
    pub coordinates: Option<(f64, f64)>,
    pub max_travel_radius_km: f64,
    pub budget_min: Option<f64>,
    pub budget_max: Option<f64>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ScoredCandidate {
    pub target: ActorProfile,
    pub gig: Option<Gig>,
    pub score: f32,
    pub match_reasons: Vec<String>,
}

pub fn score_candidate(
    actor: &ScorerProfile,
    target: &ActorProfile,
    gig: Option<&Gig>,
    now: DateTime<Utc>,
) -> (f32, Vec<String>) {
    let mut score: f32 = 0.0;
    let mut match_reasons = Vec::new();

    // Genre overlap, proportional to how much of the actor's taste is covered
    if !actor.genres.is_empty() {
        let overlap = target
            .genres
            .iter()
            .filter(|g| actor.genres.contains(g))
            .count();
        if overlap > 0 {
            score += (overlap as f32 / actor.genres.len() as f32) * GENRE_WEIGHT;
            match_reasons.push(format!("{} shared genres", overlap));
        }
    }

    // Distance decay; contributes nothing when either side has no coordinates
    if let (Some((lat, lng)), Some((t_lat, t_lng))) = (actor.coordinates, target.coordinates()) {
        if actor.max_travel_radius_km > 0.0 {
            let distance = crate::utils::geo::haversine_km(lat, lng, t_lat, t_lng);
            let decay = (DISTANCE_WEIGHT
                - (distance / actor.max_travel_radius_km) as f32 * DISTANCE_WEIGHT)
                .max(0.0);
            score += decay;
            if decay > 0.0 {
                match_reasons.push(format!("{:.0} km away", distance));
            }
        }
    }

    // Price compatibility: full bonus inside the budget, partial within 1.5x
    if let (Some(budget_max), Some(rate)) = (actor.budget_max, candidate_rate(target, gig)) {
        if rate <= budget_max {
            score += PRICE_FULL_BONUS;
            match_reasons.push("Within budget".to_string());
        } else if rate <= budget_max * 1.5 {
            score += PRICE_PARTIAL_BONUS;
            match_reasons.push("Slightly above budget".to_string());
        }
    }

    // Reputation, linear over the 0-5 rating scale
    if let Some(rating) = target.rating {
        let reputation = ((rating / 5.0) * REPUTATION_WEIGHT).min(REPUTATION_WEIGHT);
        score += reputation;
        if rating >= 4.0 {
            match_reasons.push("Highly rated".to_string());
        }
    }

    // Recency of the opportunity (or of the profile when there is none)
    let freshness_anchor = gig.map(|g| g.created_at).unwrap_or(target.created_at);
    if now - freshness_anchor <= Duration::days(RECENCY_WINDOW_DAYS) {
        score += RECENCY_BONUS;
        match_reasons.push("Recently posted".to_string());
    }

    (score.min(MAX_SCORE), match_reasons)
}

/// The figure compared against the actor's budget: the gig budget when the
/// candidate comes with an opportunity, otherwise the profile's asking rate.
fn candidate_rate(target: &ActorProfile, gig: Option<&Gig>) -> Option<f64> {
    if let Some(gig) = gig {
        return gig.budget.to_f64();
    }
    target.min_rate.as_ref().and_then(|r| r.to_f64())
}

/// Sort by score descending, ties broken newest-first on the opportunity
/// (falling back to the profile) creation time.
pub fn rank_candidates(candidates: &mut [ScoredCandidate]) {
    candidates.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| {
                let a_created = a.gig.as_ref().map(|g| g.created_at).unwrap_or(a.target.created_at);
                let b_created = b.gig.as_ref().map(|g| g.created_at).unwrap_or(b.target.created_at);
                b_created.cmp(&a_created)
            })
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::actormodel::ActorRole;
    use sqlx::types::BigDecimal;
    use std::str::FromStr;
    use uuid::Uuid;

    fn profile(genres: &[&str], coords: Option<(f64, f64)>, rating: Option<f32>) -> ActorProfile {
        ActorProfile {
            id: Uuid::new_v4(),
            role: ActorRole::Venue,
            display_name: "The Basement".to_string(),
            visible: true,
            setup_complete: true,
            accepting_bookings: true,
            latitude: coords.map(|c| c.0),
            longitude: coords.map(|c| c.1),
            travel_radius_km: Some(50.0),
            genres: genres.iter().map(|g| g.to_string()).collect(),
            min_rate: Some(BigDecimal::from_str("500").unwrap()),
            max_rate: Some(BigDecimal::from_str("1500").unwrap()),
            rating,
            created_at: Utc::now() - Duration::days(30),
            updated_at: Utc::now(),
        }
    }

    fn actor(genres: &[&str], coords: Option<(f64, f64)>, budget_max: Option<f64>) -> ScorerProfile {
        ScorerProfile {
            genres: genres.iter().map(|g| g.to_string()).collect(),
            coordinates: coords,
            max_travel_radius_km: 50.0,
            budget_min: None,
            budget_max,
        }
    }

    #[test]
    fn identical_inputs_yield_identical_scores() {
        let now = Utc::now();
        let a = actor(&["jazz", "funk"], Some((40.0, -74.0)), Some(1000.0));
        let t = profile(&["jazz", "soul"], Some((40.1, -74.1)), Some(4.5));
        let (s1, _) = score_candidate(&a, &t, None, now);
        let (s2, _) = score_candidate(&a, &t, None, now);
        assert_eq!(s1, s2);
    }

    #[test]
    fn score_is_bounded() {
        let now = Utc::now();
        // Everything maxed: full genre overlap, zero distance, in budget,
        // perfect rating, fresh profile.
        let a = actor(&["jazz"], Some((40.0, -74.0)), Some(10_000.0));
        let mut t = profile(&["jazz"], Some((40.0, -74.0)), Some(5.0));
        t.created_at = now;
        let (score, _) = score_candidate(&a, &t, None, now);
        assert!(score <= 100.0);
        assert!(score >= 0.0);

        // Everything empty still lands in range.
        let bare_actor = actor(&[], None, None);
        let bare_target = profile(&[], None, None);
        let (score, _) = score_candidate(&bare_actor, &bare_target, None, now);
        assert!((0.0..=100.0).contains(&score));
    }

    #[test]
    fn genre_overlap_is_proportional() {
        let now = Utc::now();
        let a = actor(&["jazz", "funk"], None, None);
        let full = profile(&["jazz", "funk"], None, None);
        let half = profile(&["jazz"], None, None);
        let (full_score, _) = score_candidate(&a, &full, None, now);
        let (half_score, _) = score_candidate(&a, &half, None, now);
        assert!((full_score - half_score - 15.0).abs() < 0.01);
    }

    #[test]
    fn distance_contributes_nothing_without_coordinates() {
        let now = Utc::now();
        let a = actor(&[], None, None);
        let near = profile(&[], Some((40.0, -74.0)), None);
        let far = profile(&[], Some((51.5, -0.1)), None);
        let (near_score, _) = score_candidate(&a, &near, None, now);
        let (far_score, _) = score_candidate(&a, &far, None, now);
        assert_eq!(near_score, far_score);
    }

    #[test]
    fn price_tiers() {
        let now = Utc::now();
        let a = actor(&[], None, Some(1000.0));

        let mut in_budget = profile(&[], None, None);
        in_budget.min_rate = Some(BigDecimal::from_str("900").unwrap());
        let (s_in, _) = score_candidate(&a, &in_budget, None, now);

        let mut stretch = profile(&[], None, None);
        stretch.min_rate = Some(BigDecimal::from_str("1400").unwrap());
        let (s_stretch, _) = score_candidate(&a, &stretch, None, now);

        let mut out = profile(&[], None, None);
        out.min_rate = Some(BigDecimal::from_str("2000").unwrap());
        let (s_out, _) = score_candidate(&a, &out, None, now);

        assert!((s_in - s_stretch - 10.0).abs() < 0.01);
        assert!((s_stretch - s_out - 10.0).abs() < 0.01);
    }

    #[test]
    fn recency_bonus_applies_to_fresh_gigs() {
        let now = Utc::now();
        let a = actor(&[], None, None);
        let t = profile(&[], None, None);

        let mut fresh_gig = Gig {
            id: Uuid::new_v4(),
            venue_id: t.id,
            title: "Friday night set".to_string(),
            description: String::new(),
            genres: vec![],
            event_date: now + Duration::days(10),
            budget: BigDecimal::from_str("800").unwrap(),
            deposit_percentage: 25,
            required_performers: 1,
            booked_performer_ids: vec![],
            status: crate::models::gigmodel::GigStatus::Open,
            latitude: None,
            longitude: None,
            created_at: now - Duration::days(1),
            updated_at: now,
        };

        let (with_fresh, _) = score_candidate(&a, &t, Some(&fresh_gig), now);
        fresh_gig.created_at = now - Duration::days(10);
        let (with_stale, _) = score_candidate(&a, &t, Some(&fresh_gig), now);
        assert!((with_fresh - with_stale - RECENCY_BONUS).abs() < 0.01);
    }

    #[test]
    fn ties_break_newest_first() {
        let older = profile(&[], None, None);
        let mut newer = profile(&[], None, None);
        newer.created_at = older.created_at + Duration::days(5);

        let mut ranked = vec![
            ScoredCandidate {
                target: older.clone(),
                gig: None,
                score: 40.0,
                match_reasons: vec![],
            },
            ScoredCandidate {
                target: newer.clone(),
                gig: None,
                score: 40.0,
                match_reasons: vec![],
            },
        ];
        rank_candidates(&mut ranked);
        assert_eq!(ranked[0].target.id, newer.id);
        assert_eq!(ranked[1].target.id, older.id);
    }
}
