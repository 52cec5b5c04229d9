use anyhow::{Context, Result};
use hdk_domain::query::parse_order_date;
use hdk_domain::{Order, OrderFilter, OrderId, OrderStatus, Page};
use hdk_kitchen::OrderService;

use crate::OrderCmd;

pub async fn run(service: &OrderService, cmd: OrderCmd) -> Result<()> {
    match cmd {
        OrderCmd::List {
            status,
            date,
            ordered_by,
            start_index,
            page_length,
        } => {
            let filter = OrderFilter {
                date: date.as_deref().map(parse_order_date).transpose()?,
                status: status.as_deref().map(OrderStatus::parse).transpose()?,
                ordered_by,
            };
            let page = (start_index.is_some() || page_length.is_some()).then(|| Page {
                start_index: start_index.unwrap_or(0),
                page_length: page_length.unwrap_or(Page::DEFAULT_LENGTH),
            });

            let orders = service.list_orders_filtered(&filter, page).await?;
            for o in &orders {
                print_summary(o);
            }
            println!("count={}", orders.len());
        }

        OrderCmd::Show { id } => {
            let order = service
                .get_order(OrderId(id))
                .await?
                .with_context(|| format!("order {id} not found"))?;
            println!("{}", serde_json::to_string_pretty(&order)?);
        }

        OrderCmd::Claim { preparer } => match service.claim_next_order(&preparer).await? {
            Some(order) => {
                println!("claimed=true");
                print_summary(&order);
            }
            None => println!("claimed=false no_order_available=true"),
        },

        OrderCmd::SetStatus { id, status } => {
            let status = OrderStatus::parse(&status)?;
            let order = service.set_order_status(OrderId(id), status).await?;
            print_summary(&order);
        }

        OrderCmd::Delete { id } => {
            service.delete_order(OrderId(id)).await?;
            println!("deleted={id}");
        }
    }
    Ok(())
}

fn print_summary(o: &Order) {
    let id = o.id.map(|i| i.to_string()).unwrap_or_default();
    let prep = o
        .preparation_minutes()
        .map(|m| m.to_string())
        .unwrap_or_else(|| "-".to_string());
    println!(
        "id={} status={} ordered_by={} prepared_by={} order_time={} prep_minutes={} items={} total={}",
        id,
        o.status,
        o.ordered_by,
        o.prepared_by.as_deref().unwrap_or("-"),
        o.order_time.to_rfc3339(),
        prep,
        o.items.len(),
        o.total_price,
    );
}
