use crate::mailer::Notifier;
use crate::store::PriceStore;
use crate::types::{PriceAlert, PricePoint, SeriesKind, SeriesReport};

use chrono::{NaiveDateTime, NaiveTime};

/// Runs one scrape cycle for a single series: picks out the points newer
/// than the persisted watermark, appends them to the store, and — when
/// anything new turned up — checks the freshest scraped price against the
/// reference price, alerting on a drop below it.
///
/// Only the watermark read can make this short of data; it falls back to
/// the epoch sentinel so a first run (or a failed read) treats every
/// scraped point as new. The `UNIQUE` constraint on the observation time
/// keeps a redundant replay from duplicating rows.
pub async fn evaluate_series<S: PriceStore, N: Notifier>(
    kind: SeriesKind,
    points: Vec<PricePoint>,
    reference_price: f64,
    store: &S,
    notifier: &N,
) -> SeriesReport {
    let watermark = match store.latest_time(kind).await {
        Ok(Some(time)) => time,
        Ok(None) => NaiveDateTime::UNIX_EPOCH,
        Err(e) => {
            log::error!(
                "Not able to retrieve the latest cost entry from {}: {}",
                kind,
                e
            );
            NaiveDateTime::UNIX_EPOCH
        }
    };
    log::debug!("latest cost entry found for {}: {}", kind, watermark);

    // Strictly newer than the watermark, so the watermark date itself is
    // never re-inserted.
    let new_points: Vec<&PricePoint> = points
        .iter()
        .filter(|p| p.date > watermark.date())
        .collect();

    let mut inserted = 0;
    for point in &new_points {
        match store
            .insert(kind, point.date.and_time(NaiveTime::MIN), point.price)
            .await
        {
            Ok(()) => inserted += 1,
            Err(e) => log::error!("Failed to insert {} entry [{}]: {}", kind, point, e),
        }
    }

    let mut alert = None;
    if new_points.is_empty() {
        log::info!("no new cost entries found for {}", kind);
    } else {
        log::info!("new cost entries found for {}", kind);

        // The freshest point of the whole scraped set, not just of the new
        // ones: an out-of-order new row must not trigger on a stale price.
        if let Some(latest) = points.iter().max_by_key(|p| p.date)
            && latest.price < reference_price
        {
            let price_alert = PriceAlert::new(kind, latest.price, reference_price);
            if let Err(e) = notifier.notify(&price_alert).await {
                log::error!("Error sending email: {}", e);
            }
            alert = Some(price_alert);
        }
    }

    SeriesReport {
        kind,
        points,
        watermark,
        inserted,
        alert,
    }
}
