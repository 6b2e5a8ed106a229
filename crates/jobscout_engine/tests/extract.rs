mod support;

use std::time::Duration;

use jobscout_core::UNKNOWN;
use jobscout_engine::{
    extract_listings, probe_element, DriverError, EngineEvent, PageDriver, ProbeSettings,
};
use pretty_assertions::assert_eq;
use support::{
    init_logging, listing_page, test_site, Card, RecordingSink, StaticSite, BASE, LISTING_URL,
};

const SALARY: &str = "$60,000";

fn slug(n: usize) -> String {
    format!("backend-developer-company{n}-{}", 2_000_000 + n)
}

fn cards() -> Vec<Card> {
    (1..=3)
        .map(|n| {
            Card::new(&format!("Developer {n}"), &slug(n))
                .company("Globex Corporation")
                .salary(SALARY)
        })
        .collect()
}

#[tokio::test]
async fn failed_field_reads_do_not_abort_the_element_or_the_batch() {
    init_logging();
    let site = test_site();
    let driver = StaticSite::new()
        .with_page(LISTING_URL, listing_page(&cards()))
        .with_read_failure(
            site.selectors.company.clone(),
            1,
            DriverError::Timeout(Duration::from_millis(1000)),
        )
        .with_read_failure(
            site.selectors.list_salary.clone(),
            2,
            DriverError::Script("detached node".to_string()),
        );
    let page = driver.open_page().await.unwrap();
    page.navigate(LISTING_URL, Duration::from_secs(1)).await.unwrap();
    let handles = page.elements(&site.selectors.container).await.unwrap();
    let sink = RecordingSink::new();

    let records = extract_listings(
        page.as_ref(),
        &handles,
        &site,
        &ProbeSettings::default(),
        &sink,
    )
    .await;

    assert_eq!(records.len(), 3);

    let first = &records[0];
    assert_eq!(first.title, "Developer 1");
    assert_eq!(first.company_name, "Globex Corporation");
    assert_eq!(first.salary, SALARY);

    let second = &records[1];
    assert_eq!(second.title, "Developer 2");
    assert_eq!(second.url, format!("{BASE}/jobs/{}", slug(2)));
    assert_eq!(second.company_name, "Company2");
    assert_eq!(second.salary, SALARY);

    let third = &records[2];
    assert_eq!(third.title, "Developer 3");
    assert_eq!(third.company_name, "Globex Corporation");
    assert_eq!(third.salary, UNKNOWN);

    assert_eq!(sink.events(), vec![EngineEvent::ListingsProcessed(3)]);
    page.close().await.unwrap();
}

#[tokio::test]
async fn failed_title_read_drops_the_element() {
    init_logging();
    let site = test_site();
    let driver = StaticSite::new()
        .with_page(LISTING_URL, listing_page(&cards()))
        .with_read_failure(
            site.selectors.title_link.clone(),
            0,
            DriverError::Timeout(Duration::from_millis(500)),
        );
    let page = driver.open_page().await.unwrap();
    page.navigate(LISTING_URL, Duration::from_secs(1)).await.unwrap();
    let handles = page.elements(&site.selectors.container).await.unwrap();

    let dropped = probe_element(
        page.as_ref(),
        &handles[0],
        &site.selectors,
        &ProbeSettings::default(),
    )
    .await;
    let kept = probe_element(
        page.as_ref(),
        &handles[1],
        &site.selectors,
        &ProbeSettings::default(),
    )
    .await;

    assert_eq!(dropped, Default::default());
    assert_eq!(kept.title.as_deref(), Some("Developer 2"));
    assert_eq!(kept.salary_texts, vec![SALARY.to_string()]);
    page.close().await.unwrap();
}
