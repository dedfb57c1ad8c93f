//! End-to-end order lifecycle over the in-memory catalog and journal.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use catalog::{CatalogStore, InMemoryCatalog, LineRequest, Product};
use common::{AggregateId, CustomerId, Money, ProductId};
use domain::{Aggregate, DomainError, OrderError, OrderStatus};
use event_store::{
    AppendOptions, EventEnvelope, EventStore, EventStoreError, InMemoryEventStore, Version,
};
use lifecycle::{InMemoryNotifier, LifecycleController, LifecycleError, NotificationPayload};

type Controller = LifecycleController<InMemoryEventStore, InMemoryCatalog>;

struct Fixture {
    controller: Controller,
    catalog: InMemoryCatalog,
    notifier: InMemoryNotifier,
}

fn fixture(products: &[(&str, i64, u32)]) -> Fixture {
    let catalog = InMemoryCatalog::from_products(products.iter().map(|&(id, dollars, stock)| {
        Product::new(id, format!("Product {id}"), Money::from_dollars(dollars), stock)
    }))
    .unwrap();
    let notifier = InMemoryNotifier::new();
    let controller = LifecycleController::new(
        InMemoryEventStore::new(),
        catalog.clone(),
        Arc::new(notifier.clone()),
    );
    Fixture {
        controller,
        catalog,
        notifier,
    }
}

async fn stock(catalog: &InMemoryCatalog, id: &str) -> u32 {
    catalog.get_product(&ProductId::new(id)).await.unwrap().stock
}

mod placement {
    use super::*;

    #[tokio::test]
    async fn order_within_stock_is_placed() {
        let f = fixture(&[("P", 10, 5)]);
        let customer = CustomerId::new();

        let order = f
            .controller
            .place_order(customer, vec![LineRequest::new("P", 3)])
            .await
            .unwrap();

        assert_eq!(order.status(), OrderStatus::Pending);
        assert_eq!(order.total(), Money::from_dollars(30));
        assert_eq!(order.customer_id(), Some(customer));
        assert_eq!(stock(&f.catalog, "P").await, 2);
    }

    #[tokio::test]
    async fn order_beyond_stock_is_rejected_without_side_effects() {
        let f = fixture(&[("P", 10, 2)]);
        let customer = CustomerId::new();

        let err = f
            .controller
            .place_order(customer, vec![LineRequest::new("P", 3)])
            .await
            .unwrap_err();

        assert_eq!(err.kind(), "InsufficientStock");
        assert_eq!(stock(&f.catalog, "P").await, 2);
        assert!(f.controller.list_orders(customer).await.unwrap().is_empty());
        assert_eq!(f.notifier.attempts().await, 0);
    }

    #[tokio::test]
    async fn shortfall_on_later_line_restores_earlier_lines() {
        let f = fixture(&[("P1", 10, 5), ("P2", 3, 1)]);

        let err = f
            .controller
            .place_order(
                CustomerId::new(),
                vec![LineRequest::new("P1", 2), LineRequest::new("P2", 1000)],
            )
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            LifecycleError::Reservation(catalog::ReservationError::InsufficientStock { ref product_id, .. })
                if product_id.as_str() == "P2"
        ));
        assert_eq!(stock(&f.catalog, "P1").await, 5);
        assert_eq!(stock(&f.catalog, "P2").await, 1);
        assert!(f.controller.list_all_orders().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn invalid_request_is_rejected_before_reservation() {
        let f = fixture(&[("P", 10, 5)]);

        for lines in [vec![], vec![LineRequest::new("P", 0)]] {
            let err = f
                .controller
                .place_order(CustomerId::new(), lines)
                .await
                .unwrap_err();
            assert_eq!(err.kind(), "InvalidRequest");
        }
        assert_eq!(stock(&f.catalog, "P").await, 5);
    }

    #[tokio::test]
    async fn overflowing_total_is_rejected_without_taking_stock() {
        let catalog = InMemoryCatalog::from_products([Product::new(
            "BIG",
            "Ingot",
            Money::from_cents(i64::MAX / 2),
            10,
        )])
        .unwrap();
        let controller = LifecycleController::new(
            InMemoryEventStore::new(),
            catalog.clone(),
            Arc::new(InMemoryNotifier::new()),
        );

        let err = controller
            .place_order(CustomerId::new(), vec![LineRequest::new("BIG", 3)])
            .await
            .unwrap_err();

        assert_eq!(err.kind(), "InvalidRequest");
        assert_eq!(stock(&catalog, "BIG").await, 10);
        assert!(controller.list_all_orders().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn totals_keep_the_price_at_placement() {
        let f = fixture(&[("P", 10, 5)]);
        let customer = CustomerId::new();

        let order = f
            .controller
            .place_order(customer, vec![LineRequest::new("P", 2)])
            .await
            .unwrap();
        f.catalog
            .set_price(&ProductId::new("P"), Money::from_dollars(50))
            .await
            .unwrap();

        let reloaded = f
            .controller
            .get_order(order.id().unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reloaded.total(), Money::from_dollars(20));
        assert_eq!(reloaded.lines()[0].unit_price, Money::from_dollars(10));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_placements_never_oversell() {
        let f = fixture(&[("P1", 10, 10), ("P2", 5, 6)]);

        let mut handles = Vec::new();
        for i in 0..30 {
            let controller = f.controller.clone();
            handles.push(tokio::spawn(async move {
                let lines = if i % 3 == 0 {
                    vec![LineRequest::new("P2", 1), LineRequest::new("P1", 1)]
                } else {
                    vec![LineRequest::new("P1", 1)]
                };
                controller.place_order(CustomerId::new(), lines).await
            }));
        }

        for handle in handles {
            let _ = handle.await.unwrap();
        }

        let orders = f.controller.list_all_orders().await.unwrap();
        let sold = |id: &str| -> u32 {
            orders
                .iter()
                .flat_map(|o| o.lines())
                .filter(|l| l.product_id.as_str() == id)
                .map(|l| l.quantity)
                .sum()
        };

        assert_eq!(sold("P1") + stock(&f.catalog, "P1").await, 10);
        assert_eq!(sold("P2") + stock(&f.catalog, "P2").await, 6);
        assert_eq!(stock(&f.catalog, "P1").await, 0);
    }
}

mod decisions {
    use super::*;

    async fn placed(f: &Fixture) -> AggregateId {
        f.controller
            .place_order(CustomerId::new(), vec![LineRequest::new("P", 1)])
            .await
            .unwrap()
            .id()
            .unwrap()
    }

    #[tokio::test]
    async fn approve_then_decline_fails() {
        let f = fixture(&[("P", 10, 5)]);
        let order_id = placed(&f).await;

        let order = f
            .controller
            .set_status(order_id, OrderStatus::Approved, Some("admin".into()))
            .await
            .unwrap();
        assert_eq!(order.status(), OrderStatus::Approved);

        let err = f
            .controller
            .set_status(order_id, OrderStatus::Declined, None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "InvalidTransition");

        let order = f.controller.get_order(order_id).await.unwrap().unwrap();
        assert_eq!(order.status(), OrderStatus::Approved);
    }

    #[tokio::test]
    async fn decline_keeps_stock_decremented() {
        let f = fixture(&[("P", 10, 5)]);
        let order_id = placed(&f).await;

        f.controller
            .set_status(order_id, OrderStatus::Declined, None)
            .await
            .unwrap();

        assert_eq!(stock(&f.catalog, "P").await, 4);
    }

    #[tokio::test]
    async fn unknown_order() {
        let f = fixture(&[("P", 10, 5)]);

        let err = f
            .controller
            .set_status(AggregateId::new(), OrderStatus::Approved, None)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), "OrderNotFound");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn racing_decisions_leave_one_outcome() {
        let f = fixture(&[("P", 10, 5)]);
        let order_id = placed(&f).await;

        let approve = {
            let c = f.controller.clone();
            tokio::spawn(async move { c.set_status(order_id, OrderStatus::Approved, None).await })
        };
        let decline = {
            let c = f.controller.clone();
            tokio::spawn(async move { c.set_status(order_id, OrderStatus::Declined, None).await })
        };

        let results = [approve.await.unwrap(), decline.await.unwrap()];
        let winners: Vec<_> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
        assert_eq!(winners.len(), 1);

        let final_status = f
            .controller
            .get_order(order_id)
            .await
            .unwrap()
            .unwrap()
            .status();
        assert_eq!(final_status, winners[0].status());
        assert_eq!(f.controller.order_history(order_id).await.unwrap().len(), 2);
    }
}

mod notifications {
    use super::*;

    #[tokio::test]
    async fn placement_and_decision_notify_the_customer() {
        let f = fixture(&[("P", 10, 5)]);
        let customer = CustomerId::new();

        let order = f
            .controller
            .place_order(customer, vec![LineRequest::new("P", 2)])
            .await
            .unwrap();
        let order_id = order.id().unwrap();
        f.controller
            .set_status(order_id, OrderStatus::Approved, None)
            .await
            .unwrap();

        assert!(f.notifier.wait_for_attempts(2, Duration::from_secs(1)).await);
        let mut delivered = f.notifier.delivered().await;
        delivered.sort_by_key(|n| n.idempotency_key.clone());

        assert!(delivered.iter().all(|n| n.recipient == customer));
        assert_eq!(delivered[0].idempotency_key, format!("{order_id}:approved"));
        assert_eq!(
            delivered[1].payload,
            NotificationPayload::OrderPlaced {
                total: Money::from_dollars(20),
                line_count: 1
            }
        );
    }

    #[tokio::test]
    async fn notifier_failure_does_not_undo_the_order() {
        let f = fixture(&[("P", 10, 5)]);
        f.notifier.set_fail(true).await;
        let customer = CustomerId::new();

        let order = f
            .controller
            .place_order(customer, vec![LineRequest::new("P", 1)])
            .await
            .unwrap();
        let order_id = order.id().unwrap();
        f.controller
            .set_status(order_id, OrderStatus::Declined, None)
            .await
            .unwrap();

        assert!(f.notifier.wait_for_attempts(2, Duration::from_secs(1)).await);
        assert!(f.notifier.delivered().await.is_empty());

        let order = f.controller.get_order(order_id).await.unwrap().unwrap();
        assert_eq!(order.status(), OrderStatus::Declined);
        assert_eq!(stock(&f.catalog, "P").await, 4);
    }

    #[tokio::test]
    async fn slow_notifier_does_not_delay_placement() {
        let catalog =
            InMemoryCatalog::from_products([Product::new("P", "Thing", Money::from_cents(100), 3)])
                .unwrap();
        let notifier = InMemoryNotifier::new();
        notifier.set_delay(Some(Duration::from_secs(30))).await;
        let controller = LifecycleController::with_notify_timeout(
            InMemoryEventStore::new(),
            catalog,
            Arc::new(notifier.clone()),
            Duration::from_millis(50),
        );

        let placed = tokio::time::timeout(
            Duration::from_secs(5),
            controller.place_order(CustomerId::new(), vec![LineRequest::new("P", 1)]),
        )
        .await;

        assert!(matches!(placed, Ok(Ok(_))));
        assert_eq!(notifier.attempts().await, 0);
    }
}

mod ledger_failure {
    use super::*;

    /// Journal that reads like an empty store and refuses every write.
    #[derive(Clone, Default)]
    struct ReadOnlyStore;

    #[async_trait]
    impl EventStore for ReadOnlyStore {
        async fn append(
            &self,
            _events: Vec<EventEnvelope>,
            _options: AppendOptions,
        ) -> event_store::Result<Version> {
            Err(EventStoreError::InvalidAppend("journal is read-only".into()))
        }

        async fn get_events_for_aggregate(
            &self,
            _aggregate_id: AggregateId,
        ) -> event_store::Result<Vec<EventEnvelope>> {
            Ok(vec![])
        }

        async fn get_events_by_aggregate_type(
            &self,
            _aggregate_type: &str,
        ) -> event_store::Result<Vec<EventEnvelope>> {
            Ok(vec![])
        }

        async fn get_aggregate_version(
            &self,
            _aggregate_id: AggregateId,
        ) -> event_store::Result<Option<Version>> {
            Ok(None)
        }
    }

    #[tokio::test]
    async fn failed_order_record_releases_stock() {
        let catalog = InMemoryCatalog::from_products([
            Product::new("P1", "One", Money::from_cents(100), 4),
            Product::new("P2", "Two", Money::from_cents(200), 2),
        ])
        .unwrap();
        let notifier = InMemoryNotifier::new();
        let controller =
            LifecycleController::new(ReadOnlyStore, catalog.clone(), Arc::new(notifier.clone()));

        let err = controller
            .place_order(
                CustomerId::new(),
                vec![LineRequest::new("P1", 3), LineRequest::new("P2", 2)],
            )
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            LifecycleError::Ledger(DomainError::EventStore(EventStoreError::InvalidAppend(_)))
        ));
        assert_eq!(err.kind(), "LedgerFailure");
        assert_eq!(stock(&catalog, "P1").await, 4);
        assert_eq!(stock(&catalog, "P2").await, 2);
        assert_eq!(notifier.attempts().await, 0);
    }

    /// Journal whose writes land but report failure, like a connection
    /// dropped after COMMIT.
    #[derive(Clone, Default)]
    struct CommitThenFailStore {
        inner: InMemoryEventStore,
    }

    #[async_trait]
    impl EventStore for CommitThenFailStore {
        async fn append(
            &self,
            events: Vec<EventEnvelope>,
            options: AppendOptions,
        ) -> event_store::Result<Version> {
            self.inner.append(events, options).await?;
            Err(EventStoreError::InvalidAppend(
                "connection lost after commit".into(),
            ))
        }

        async fn get_events_for_aggregate(
            &self,
            aggregate_id: AggregateId,
        ) -> event_store::Result<Vec<EventEnvelope>> {
            self.inner.get_events_for_aggregate(aggregate_id).await
        }

        async fn get_events_by_aggregate_type(
            &self,
            aggregate_type: &str,
        ) -> event_store::Result<Vec<EventEnvelope>> {
            self.inner.get_events_by_aggregate_type(aggregate_type).await
        }

        async fn get_aggregate_version(
            &self,
            aggregate_id: AggregateId,
        ) -> event_store::Result<Option<Version>> {
            self.inner.get_aggregate_version(aggregate_id).await
        }
    }

    #[tokio::test]
    async fn order_recorded_despite_storage_error_keeps_its_stock() {
        let catalog =
            InMemoryCatalog::from_products([Product::new("P1", "One", Money::from_cents(100), 4)])
                .unwrap();
        let notifier = InMemoryNotifier::new();
        let controller = LifecycleController::new(
            CommitThenFailStore::default(),
            catalog.clone(),
            Arc::new(notifier.clone()),
        );
        let customer = CustomerId::new();

        let order = controller
            .place_order(customer, vec![LineRequest::new("P1", 3)])
            .await
            .unwrap();

        assert_eq!(order.status(), OrderStatus::Pending);
        assert_eq!(stock(&catalog, "P1").await, 1);
        let listed = controller.list_orders(customer).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id(), order.id());
        assert!(notifier.wait_for_attempts(1, Duration::from_secs(1)).await);
    }

    #[test]
    fn order_error_passes_through() {
        let err = LifecycleError::from(DomainError::Order(OrderError::NoLines));
        assert_eq!(err.kind(), "InvalidRequest");
    }
}

mod cancellation {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    /// Catalog that takes `delay` before every decrement and counts restores.
    #[derive(Clone)]
    struct SlowCatalog {
        inner: InMemoryCatalog,
        delay: Duration,
        restores: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl CatalogStore for SlowCatalog {
        async fn get_product(&self, id: &ProductId) -> catalog::error::Result<Product> {
            self.inner.get_product(id).await
        }

        async fn list_products(&self) -> catalog::error::Result<Vec<Product>> {
            self.inner.list_products().await
        }

        async fn try_decrement(&self, id: &ProductId, quantity: u32) -> catalog::error::Result<u32> {
            tokio::time::sleep(self.delay).await;
            self.inner.try_decrement(id, quantity).await
        }

        async fn restore(&self, id: &ProductId, quantity: u32) -> catalog::error::Result<u32> {
            let stock = self.inner.restore(id, quantity).await;
            self.restores.fetch_add(1, Ordering::SeqCst);
            stock
        }
    }

    fn slow_controller(
        inner: &InMemoryCatalog,
    ) -> (LifecycleController<InMemoryEventStore, SlowCatalog>, Arc<AtomicUsize>) {
        let restores = Arc::new(AtomicUsize::new(0));
        let controller = LifecycleController::new(
            InMemoryEventStore::new(),
            SlowCatalog {
                inner: inner.clone(),
                delay: Duration::from_millis(50),
                restores: Arc::clone(&restores),
            },
            Arc::new(InMemoryNotifier::new()),
        );
        (controller, restores)
    }

    #[tokio::test]
    async fn caller_timeout_does_not_abandon_a_placement() {
        let inner =
            InMemoryCatalog::from_products([Product::new("P1", "One", Money::from_cents(100), 5)])
                .unwrap();
        let (controller, _) = slow_controller(&inner);
        let customer = CustomerId::new();

        let outcome = tokio::time::timeout(
            Duration::from_millis(10),
            controller.place_order(customer, vec![LineRequest::new("P1", 2)]),
        )
        .await;
        assert!(outcome.is_err(), "placement should outlive the caller's timeout");

        let mut orders = Vec::new();
        for _ in 0..100 {
            orders = controller.list_orders(customer).await.unwrap();
            if !orders.is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].lines()[0].quantity, 2);
        assert_eq!(stock(&inner, "P1").await, 3);
    }

    #[tokio::test]
    async fn caller_timeout_does_not_abandon_a_rollback() {
        let inner = InMemoryCatalog::from_products([
            Product::new("P1", "One", Money::from_cents(100), 5),
            Product::new("P2", "Two", Money::from_cents(200), 1),
        ])
        .unwrap();
        let (controller, restores) = slow_controller(&inner);

        let outcome = tokio::time::timeout(
            Duration::from_millis(10),
            controller.place_order(
                CustomerId::new(),
                vec![LineRequest::new("P1", 2), LineRequest::new("P2", 5)],
            ),
        )
        .await;
        assert!(outcome.is_err());

        for _ in 0..100 {
            if restores.load(Ordering::SeqCst) > 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        assert_eq!(restores.load(Ordering::SeqCst), 1);
        assert_eq!(stock(&inner, "P1").await, 5);
        assert_eq!(stock(&inner, "P2").await, 1);
        assert!(controller.list_all_orders().await.unwrap().is_empty());
    }
}

mod queries {
    use super::*;

    #[tokio::test]
    async fn list_orders_is_per_customer_and_newest_first() {
        let f = fixture(&[("P", 10, 50)]);
        let alice = CustomerId::new();
        let bob = CustomerId::new();

        let mut alice_ids = Vec::new();
        for _ in 0..3 {
            let order = f
                .controller
                .place_order(alice, vec![LineRequest::new("P", 1)])
                .await
                .unwrap();
            alice_ids.push(order.id().unwrap());
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
        f.controller
            .place_order(bob, vec![LineRequest::new("P", 1)])
            .await
            .unwrap();

        let listed: Vec<_> = f
            .controller
            .list_orders(alice)
            .await
            .unwrap()
            .iter()
            .filter_map(|o| o.id())
            .collect();
        alice_ids.reverse();
        assert_eq!(listed, alice_ids);

        assert_eq!(f.controller.list_all_orders().await.unwrap().len(), 4);
    }
}
