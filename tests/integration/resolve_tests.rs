//! Strategy chain behavior against in-memory catalogs

use crate::support::{sources, FakeCatalog, FakeSearch};
use device_resolver::record::{BatchItem, Identifier, Resolution};
use device_resolver::resolver::{
    Resolver, ResolverOptions, StrategyCounters, StrategyTally, EXHAUSTED_REASON,
};
use device_resolver::sources::Sources;
use device_resolver::{Brand, Method};
use std::sync::Arc;
use std::time::Duration;

fn item(code: &str) -> BatchItem {
    BatchItem::new(Identifier::parse(code).unwrap())
}

fn resolver(sources: Sources) -> (Resolver, Arc<StrategyCounters>) {
    let counters = Arc::new(StrategyCounters::new());
    let resolver = Resolver::new(sources, Arc::clone(&counters), ResolverOptions::default());
    (resolver, counters)
}

/// Secondary catalog knows the code, primary knows the name but has no date
fn zx100_sources() -> Sources {
    let secondary = FakeCatalog::new("gsmchoice")
        .identifier("ZX-100", "Acme ZX100", "choice://acme-zx100")
        .detail("choice://acme-zx100", "Acme ZX100", "2021, March 3", "");
    let primary = FakeCatalog::new("gsmarena")
        .name("Acme ZX100", "Acme ZX100", "arena://acme_zx100-1.php")
        .detail("arena://acme_zx100-1.php", "Acme ZX100", "", "About 150 EUR");

    sources(primary, secondary, FakeSearch::empty())
}

#[tokio::test]
async fn test_name_resolution_merges_secondary_date() {
    let (resolver, counters) = resolver(zx100_sources());

    let resolution = resolver.resolve(&item("ZX-100")).await;
    let Resolution::Resolved(record) = resolution else {
        panic!("expected a resolved record, got {:?}", resolution);
    };

    assert_eq!(record.identifier.as_str(), "ZX-100");
    assert_eq!(record.device_name, "Acme ZX100");
    assert_eq!(record.method_used, Method::NameResolution);
    assert_eq!(record.method_used.as_tag(), "gsmchoice_gsmarena");
    assert_eq!(record.announced_date, "2021, March 3");
    assert_eq!(record.announced_date_source, "gsmchoice");
    assert_eq!(record.price, "About 150 EUR");
    assert_eq!(record.price_source, "gsmarena");
    assert_eq!(record.source_reference, "arena://acme_zx100-1.php");

    // Cross-reference ran first and found nothing
    assert_eq!(
        counters.tally(Method::CrossReference),
        StrategyTally { attempts: 1, hits: 0 }
    );
    assert_eq!(
        counters.tally(Method::NameResolution),
        StrategyTally { attempts: 1, hits: 1 }
    );
    assert_eq!(counters.tally(Method::Direct).attempts, 0);
    assert_eq!(counters.tally(Method::BrandSpecial).attempts, 0);
    assert_eq!(counters.web_searches(), 1);
    assert_eq!(counters.secondary_lookups(), 1);
    assert_eq!(counters.date_enrichments(), 0);
}

#[tokio::test]
async fn test_cross_reference_hit_stops_the_chain() {
    let primary = FakeCatalog::new("gsmarena")
        .detail("arena://oppo_a96-11827.php", "Oppo A96", "2022, February 16", "About 250 EUR");
    let search = FakeSearch::returning("arena://oppo_a96-11827.php");
    let secondary = FakeCatalog::new("gsmchoice");

    let (resolver, counters) = resolver(sources(primary, secondary, search));

    let resolution = resolver.resolve(&item("CPH2471")).await;
    assert_eq!(resolution.method(), Some(Method::CrossReference));

    let Resolution::Resolved(record) = resolution else {
        unreachable!();
    };
    assert_eq!(record.device_name, "Oppo A96");
    assert_eq!(record.announced_date_source, "gsmarena");

    assert_eq!(counters.tally(Method::NameResolution).attempts, 0);
    assert_eq!(counters.secondary_lookups(), 0);
}

#[tokio::test]
async fn test_brand_special_runs_first_for_moto_family() {
    let primary = FakeCatalog::new("gsmarena")
        .any_name("Motorola Moto G30", "arena://motorola_moto_g30-10794.php")
        .detail(
            "arena://motorola_moto_g30-10794.php",
            "Motorola Moto G30",
            "2021, February 22",
            "About 170 EUR",
        );
    let (resolver, counters) = resolver(sources(
        primary,
        FakeCatalog::new("gsmchoice"),
        FakeSearch::empty(),
    ));

    let resolution = resolver.resolve(&item("moto g(30)")).await;

    assert_eq!(resolution.method(), Some(Method::BrandSpecial));
    assert_eq!(
        counters.tally(Method::BrandSpecial),
        StrategyTally { attempts: 1, hits: 1 }
    );
    assert_eq!(counters.web_searches(), 0);
}

#[tokio::test]
async fn test_direct_search_is_last_resort() {
    let primary = FakeCatalog::new("gsmarena")
        .identifier("SM-A245F", "Samsung Galaxy A24", "arena://samsung_galaxy_a24-12421.php")
        .detail(
            "arena://samsung_galaxy_a24-12421.php",
            "Samsung Galaxy A24",
            "2023, April 18",
            "",
        );
    let (resolver, counters) = resolver(sources(
        primary,
        FakeCatalog::new("gsmchoice"),
        FakeSearch::empty(),
    ));

    let resolution = resolver.resolve(&item("SM-A245F")).await;

    assert_eq!(resolution.method(), Some(Method::Direct));
    assert_eq!(counters.tally(Method::CrossReference).attempts, 1);
    assert_eq!(counters.tally(Method::NameResolution).attempts, 1);
    assert_eq!(counters.tally(Method::Direct).hits, 1);
    // Secondary was consulted (and found nothing), so no second lookup
    assert_eq!(counters.secondary_lookups(), 1);
    assert_eq!(counters.date_enrichments(), 0);
}

#[tokio::test]
async fn test_missing_date_is_enriched_from_secondary() {
    let primary = FakeCatalog::new("gsmarena")
        .detail("arena://vivo_y21-11063.php", "vivo Y21", "", "About 180 EUR");
    let secondary = FakeCatalog::new("gsmchoice")
        .identifier("V2111", "Vivo Y21", "choice://vivo-y21")
        .detail("choice://vivo-y21", "Vivo Y21", "2021-08", "");
    let (resolver, counters) = resolver(sources(
        primary,
        secondary,
        FakeSearch::returning("arena://vivo_y21-11063.php"),
    ));

    let resolution = resolver.resolve(&item("V2111")).await;
    let Resolution::Resolved(record) = resolution else {
        panic!("expected a resolved record, got {:?}", resolution);
    };

    assert_eq!(record.method_used, Method::CrossReference);
    assert_eq!(record.announced_date, "2021-08");
    assert_eq!(record.announced_date_source, "gsmchoice");
    assert_eq!(record.price_source, "gsmarena");
    assert_eq!(counters.date_enrichments(), 1);
    assert_eq!(counters.secondary_lookups(), 1);
}

#[tokio::test]
async fn test_enrichment_can_be_disabled() {
    let primary = FakeCatalog::new("gsmarena")
        .detail("arena://vivo_y21-11063.php", "vivo Y21", "", "About 180 EUR");
    let secondary = FakeCatalog::new("gsmchoice")
        .identifier("V2111", "Vivo Y21", "choice://vivo-y21")
        .detail("choice://vivo-y21", "Vivo Y21", "2021-08", "");

    let counters = Arc::new(StrategyCounters::new());
    let options = ResolverOptions {
        enrich_missing_dates: false,
        ..ResolverOptions::default()
    };
    let resolver = Resolver::new(
        sources(primary, secondary, FakeSearch::returning("arena://vivo_y21-11063.php")),
        Arc::clone(&counters),
        options,
    );

    let Resolution::Resolved(record) = resolver.resolve(&item("V2111")).await else {
        panic!("expected a resolved record");
    };
    assert!(record.announced_date.is_empty());
    assert_eq!(counters.secondary_lookups(), 0);
}

#[tokio::test]
async fn test_incomplete_records_are_not_accepted() {
    let primary = FakeCatalog::new("gsmarena")
        .identifier("XQ-BC52", "Sony Xperia", "arena://unknown.php")
        .detail("arena://unknown.php", "Unknown", "2021", "About 900 EUR")
        .detail("arena://no-date-no-price.php", "Sony Xperia 1 III", "", "Price not available");
    let (resolver, counters) = resolver(sources(
        primary,
        FakeCatalog::new("gsmchoice"),
        FakeSearch::returning("arena://no-date-no-price.php"),
    ));

    let resolution = resolver.resolve(&item("XQ-BC52")).await;

    let Resolution::Failed(failure) = resolution else {
        panic!("incomplete records must not be accepted");
    };
    assert_eq!(failure.reason, EXHAUSTED_REASON);
    assert_eq!(counters.tally(Method::CrossReference).hits, 0);
    assert_eq!(counters.tally(Method::Direct).hits, 0);
}

#[tokio::test]
async fn test_last_error_becomes_failure_reason() {
    let primary = FakeCatalog::new("gsmarena").broken("CPH9999");
    let secondary = FakeCatalog::new("gsmchoice").broken("CPH9999");
    let search = FakeSearch {
        fail: true,
        ..FakeSearch::default()
    };
    let (resolver, counters) = resolver(sources(primary, secondary, search));

    let resolution = resolver.resolve(&item("CPH9999")).await;

    let Resolution::Failed(failure) = resolution else {
        panic!("every adapter is down");
    };
    assert!(failure.reason.starts_with("gsmarena_direct"), "{}", failure.reason);
    assert!(failure.reason.contains("down"), "{}", failure.reason);
    for method in [Method::CrossReference, Method::NameResolution, Method::Direct] {
        assert_eq!(counters.tally(method), StrategyTally { attempts: 1, hits: 0 });
    }
}

#[tokio::test]
async fn test_slow_strategy_times_out_and_chain_continues() {
    let primary = FakeCatalog::new("gsmarena")
        .identifier("SM-G991B", "Samsung Galaxy S21 5G", "arena://s21.php")
        .detail("arena://s21.php", "Samsung Galaxy S21 5G", "2021, January 14", "");
    let search = FakeSearch {
        delay: Some(Duration::from_secs(30)),
        ..FakeSearch::returning("arena://never.php")
    };

    let counters = Arc::new(StrategyCounters::new());
    let options = ResolverOptions {
        strategy_timeout: Duration::from_millis(50),
        ..ResolverOptions::default()
    };
    let resolver = Resolver::new(
        sources(primary, FakeCatalog::new("gsmchoice"), search),
        Arc::clone(&counters),
        options,
    );

    let resolution = resolver.resolve(&item("SM-G991B")).await;

    assert_eq!(resolution.method(), Some(Method::Direct));
    assert_eq!(counters.tally(Method::CrossReference).hits, 0);
}

#[tokio::test]
async fn test_manufacturer_hint_overrides_inference() {
    let primary = FakeCatalog::new("gsmarena")
        .detail("arena://galaxy_x9.php", "Samsung Galaxy X9", "2024, May 2", "");
    let (resolver, _) = resolver(sources(
        primary,
        FakeCatalog::new("gsmchoice"),
        FakeSearch::returning("arena://galaxy_x9.php"),
    ));

    let hinted = item("ZX-9").with_manufacturer("Samsung Electronics");
    let Resolution::Resolved(record) = resolver.resolve(&hinted).await else {
        panic!("expected a resolved record");
    };
    assert_eq!(record.inferred_brand, Brand::Samsung);

    let Resolution::Resolved(record) = resolver.resolve(&item("ZX-9")).await else {
        panic!("expected a resolved record");
    };
    assert_eq!(record.inferred_brand, Brand::Unknown);
}
