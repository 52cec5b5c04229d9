//! Scenario: concurrent preparers never receive the same order.
//!
//! # Invariants under test
//! - N concurrent claims over K waiting orders yield exactly min(N, K)
//!   orders, all distinct.
//! - Two claims racing for a single order: one wins, the other gets `None`.
//! - A claim with nothing waiting returns `None` and mutates nothing.

use std::collections::HashSet;
use std::sync::Arc;

use futures_util::future::join_all;
use hdk_db::MemOrderStore;
use hdk_domain::{ItemKind, NewItem, NewOrder, Order, OrderStatus};
use hdk_kitchen::OrderService;

fn service() -> OrderService {
    OrderService::new(Arc::new(MemOrderStore::new()))
}

async fn seed(svc: &OrderService, k: usize) -> anyhow::Result<()> {
    for i in 0..k {
        svc.create_order(
            NewOrder::new(format!("till-{i}")).with_item(NewItem::of(ItemKind::Classic)),
        )
        .await?;
    }
    Ok(())
}

async fn race(svc: &OrderService, n: usize) -> anyhow::Result<Vec<Option<Order>>> {
    let tasks = (0..n).map(|i| {
        let svc = svc.clone();
        tokio::spawn(async move { svc.claim_next_order(&format!("chef-{i}")).await })
    });
    let mut out = Vec::with_capacity(n);
    for joined in join_all(tasks).await {
        out.push(joined??);
    }
    Ok(out)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn claims_are_exactly_min_of_claimers_and_orders() -> anyhow::Result<()> {
    for (n, k) in [(10, 4), (4, 10), (6, 6)] {
        let svc = service();
        seed(&svc, k).await?;

        let results = race(&svc, n).await?;
        let won: Vec<&Order> = results.iter().flatten().collect();
        let ids: HashSet<_> = won.iter().map(|o| o.id).collect();

        assert_eq!(won.len(), n.min(k), "n={n} k={k}");
        assert_eq!(ids.len(), won.len(), "no order handed out twice (n={n} k={k})");
        assert!(won.iter().all(|o| o.status == OrderStatus::InPreparation));

        let waiting = svc.list_orders_by_status(OrderStatus::Ordered).await?;
        assert_eq!(waiting.len(), k.saturating_sub(n));
    }
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn two_claimers_one_order() -> anyhow::Result<()> {
    let svc = service();
    seed(&svc, 1).await?;

    let results = race(&svc, 2).await?;
    let winners: Vec<(usize, &Order)> = results
        .iter()
        .enumerate()
        .filter_map(|(i, r)| r.as_ref().map(|o| (i, o)))
        .collect();

    assert_eq!(winners.len(), 1, "exactly one claimer wins");
    let (who, order) = winners[0];
    assert_eq!(order.status, OrderStatus::InPreparation);
    assert_eq!(order.prepared_by.as_deref(), Some(format!("chef-{who}").as_str()));
    assert!(order.preparation_time.is_some());
    Ok(())
}

#[tokio::test]
async fn empty_queue_claim_is_a_no_op() -> anyhow::Result<()> {
    let svc = service();
    let placed = svc
        .create_order(NewOrder::new("till-1").with_item(NewItem::of(ItemKind::Alsace)))
        .await?;
    let id = placed.id.expect("id");
    svc.set_order_status(id, OrderStatus::Ready).await?;

    let before = svc.list_orders().await?;
    assert!(svc.claim_next_order("chef-a").await?.is_none());
    assert_eq!(svc.list_orders().await?, before);
    Ok(())
}
