//! Final release selection
//!
//! Applies delay-profile policy and protocol preference over evaluated
//! releases and picks the one to grab. Also owns the canonical ordering of
//! search results.

use arenarr_core::models::delay_profile::DelayProfile;
use arenarr_core::models::release::ReleaseSearchResult;
use chrono::{DateTime, Utc};

/// Score bonus granted to releases on the preferred protocol.
pub const PROTOCOL_BONUS: i32 = 25;

/// Sort search results by `(approved, quality score, custom-format score,
/// seeders, size score)`, best first.
pub fn sort_search_results(releases: &mut [ReleaseSearchResult]) {
    releases.sort_by(|a, b| b.ranking_key().cmp(&a.ranking_key()));
}

/// Pick the best grabbable release among evaluated candidates.
///
/// Only approved releases are considered. Releases still inside their delay
/// window are skipped. The effective score adds the protocol bonus from the
/// event's delay profile; ties fall back to the search ordering key.
pub fn select_best_release<'a>(
    releases: &'a [ReleaseSearchResult],
    delay_profiles: &[DelayProfile],
    event_tags: &[i32],
    is_highest_quality: impl Fn(&ReleaseSearchResult) -> bool,
    now: DateTime<Utc>,
) -> Option<&'a ReleaseSearchResult> {
    let profile = DelayProfile::select(delay_profiles, event_tags);

    let mut best: Option<(&ReleaseSearchResult, i32)> = None;
    for release in releases.iter().filter(|r| r.approved) {
        if let Some(profile) = profile {
            if profile.is_delayed(
                release.publish_date,
                release.protocol,
                is_highest_quality(release),
                release.custom_format_score,
                now,
            ) {
                continue;
            }
        }

        let mut effective = release.score;
        if let Some(profile) = profile {
            if profile.preferred_protocol == release.protocol {
                effective += PROTOCOL_BONUS;
            }
        }

        let better = match best {
            None => true,
            Some((current, current_score)) => {
                effective > current_score
                    || (effective == current_score
                        && release.ranking_key() > current.ranking_key())
            }
        };
        if better {
            best = Some((release, effective));
        }
    }
    best.map(|(release, _)| release)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arenarr_core::models::release::ReleaseProtocol;
    use chrono::Duration;

    fn release(guid: &str, protocol: ReleaseProtocol, score: i32) -> ReleaseSearchResult {
        let mut release = ReleaseSearchResult::new(
            1,
            "mock".to_string(),
            format!("Event.2024.1080p-{guid}"),
            guid.to_string(),
            "http://example.test/dl".to_string(),
            protocol,
        );
        release.approved = true;
        release.score = score;
        release.quality_score = score;
        release.publish_date = Some(Utc::now() - Duration::hours(48));
        release
    }

    #[test]
    fn search_ordering_is_componentwise() {
        let mut a = release("a", ReleaseProtocol::Torrent, 100);
        a.approved = false;
        a.quality_score = 900;
        let b = release("b", ReleaseProtocol::Torrent, 100);
        let mut c = release("c", ReleaseProtocol::Torrent, 100);
        c.seeders = Some(10);

        let mut releases = vec![a, b, c];
        sort_search_results(&mut releases);

        // Approved releases first; among equals, seeders break the tie
        assert_eq!(releases[0].guid, "c");
        assert_eq!(releases[1].guid, "b");
        assert_eq!(releases[2].guid, "a");
    }

    #[test]
    fn preferred_protocol_wins_close_scores() {
        let mut usenet_profile = DelayProfile::default_profile();
        usenet_profile.preferred_protocol = ReleaseProtocol::Usenet;

        let torrent = release("t", ReleaseProtocol::Torrent, 100);
        let usenet = release("u", ReleaseProtocol::Usenet, 90);

        let releases = vec![torrent, usenet];
        let best = select_best_release(&releases, &[usenet_profile], &[], |_| false, Utc::now())
            .unwrap();
        assert_eq!(best.guid, "u");
    }

    #[test]
    fn delayed_release_is_skipped() {
        let mut profile = DelayProfile::default_profile();
        profile.torrent_delay_mins = 120;

        let mut fresh = release("fresh", ReleaseProtocol::Torrent, 500);
        fresh.publish_date = Some(Utc::now() - Duration::minutes(5));
        let aged = release("aged", ReleaseProtocol::Torrent, 100);

        let releases = vec![fresh, aged];
        let best =
            select_best_release(&releases, &[profile], &[], |_| false, Utc::now()).unwrap();
        assert_eq!(best.guid, "aged");
    }

    #[test]
    fn highest_quality_bypasses_delay() {
        let mut profile = DelayProfile::default_profile();
        profile.torrent_delay_mins = 120;
        profile.bypass_if_highest_quality = true;

        let mut fresh = release("fresh", ReleaseProtocol::Torrent, 500);
        fresh.publish_date = Some(Utc::now() - Duration::minutes(5));

        let releases = vec![fresh];
        let best =
            select_best_release(&releases, &[profile], &[], |_| true, Utc::now()).unwrap();
        assert_eq!(best.guid, "fresh");
    }

    #[test]
    fn rejected_releases_are_never_selected() {
        let mut rejected = release("r", ReleaseProtocol::Torrent, 1000);
        rejected.approved = false;

        let releases = vec![rejected];
        assert!(select_best_release(&releases, &[], &[], |_| false, Utc::now()).is_none());
    }
}
