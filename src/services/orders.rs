use std::str::FromStr;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use rand::Rng;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::billing::{format_rupiah, line_total, Ledger};
use crate::changelog::{generate_change_log, OrderSnapshot};
use crate::db::DbPool;
use crate::entities::order::{
    self, ActiveModel as OrderActiveModel, Entity as OrderEntity, Model as OrderModel,
};
use crate::entities::order_history::{
    self, ActiveModel as HistoryActiveModel, Entity as HistoryEntity, Model as HistoryModel,
};
use crate::entities::order_item::{
    self, ActiveModel as OrderItemActiveModel, Entity as OrderItemEntity, Model as OrderItemModel,
};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::lifecycle::{ItemCategory, OrderStatus};

const DEFAULT_ACTOR: &str = "Admin";

/// A line item as submitted by the create/edit flows.
#[derive(Debug, Clone)]
pub struct OrderItemInput {
    pub product_name: String,
    pub category: ItemCategory,
    pub quantity: i32,
    pub notes: Option<String>,
    pub price_per_unit: i64,
}

/// Input for the creation flow.
#[derive(Debug, Clone)]
pub struct CreateOrderInput {
    /// Generated server-side (`INV-<year><month>-<random4>`) when absent.
    pub order_number: Option<String>,
    pub client_name: String,
    pub client_phone: String,
    pub current_status: OrderStatus,
    pub estimated_date: Option<NaiveDate>,
    pub dp_amount: i64,
    pub items: Vec<OrderItemInput>,
    pub actor_name: Option<String>,
}

/// Input for the edit flow. The order number is immutable and travels in
/// the path, not here.
#[derive(Debug, Clone)]
pub struct EditOrderInput {
    pub client_name: String,
    /// Empty string clears the stored phone.
    pub client_phone: String,
    pub current_status: OrderStatus,
    pub estimated_date: Option<NaiveDate>,
    pub dp_amount: i64,
    pub items: Vec<OrderItemInput>,
    pub actor_name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct OrderWithItems {
    pub order: OrderModel,
    pub items: Vec<OrderItemModel>,
}

#[derive(Debug, Clone)]
pub struct OrderDetails {
    pub order: OrderModel,
    pub items: Vec<OrderItemModel>,
    /// Newest first.
    pub history: Vec<HistoryModel>,
}

/// Service owning every order write path and the read paths that back the
/// admin listing and public tracking views.
#[derive(Clone)]
pub struct OrderService {
    db_pool: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
}

impl OrderService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Creates an order with its items and the initial history entry in
    /// one transaction.
    #[instrument(skip(self, input), fields(client_name = %input.client_name))]
    pub async fn create_order(
        &self,
        input: CreateOrderInput,
    ) -> Result<OrderWithItems, ServiceError> {
        if input.client_name.trim().is_empty() {
            return Err(ServiceError::ValidationError(
                "Nama Klien wajib diisi.".to_string(),
            ));
        }
        if input.client_phone.trim().is_empty() {
            return Err(ServiceError::ValidationError(
                "Nomor WhatsApp wajib diisi.".to_string(),
            ));
        }
        validate_items(&input.items)?;
        if input.dp_amount < 0 {
            return Err(ServiceError::ValidationError(
                "DP tidak boleh negatif.".to_string(),
            ));
        }

        let db = &*self.db_pool;
        let now = Utc::now();
        let order_id = Uuid::new_v4();
        let order_number = input
            .order_number
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(generate_order_number);
        let actor = input
            .actor_name
            .filter(|a| !a.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_ACTOR.to_string());

        let ledger = Ledger::compute(
            input.items.iter().map(|i| (i.quantity, i.price_per_unit)),
            input.dp_amount,
        );

        let txn = db.begin().await.map_err(|e| {
            error!(error = %e, "Failed to start transaction for order creation");
            ServiceError::DatabaseError(e)
        })?;

        let order_model = OrderActiveModel {
            id: Set(order_id),
            order_number: Set(order_number.clone()),
            client_name: Set(input.client_name.clone()),
            client_phone: Set(Some(input.client_phone.clone())),
            current_status: Set(input.current_status.to_string()),
            estimated_date: Set(input.estimated_date),
            grand_total: Set(ledger.grand_total),
            dp_amount: Set(ledger.dp_amount),
            remaining_balance: Set(ledger.remaining_balance),
            created_by: Set(Some(actor.clone())),
            created_at: Set(now),
        }
        .insert(&txn)
        .await
        .map_err(|e| {
            error!(error = %e, order_number = %order_number, "Failed to insert order header");
            ServiceError::DatabaseError(e)
        })?;

        insert_items(&txn, order_id, &input.items).await?;

        HistoryActiveModel {
            id: Set(Uuid::new_v4()),
            order_id: Set(order_id),
            title: Set("Pesanan Dibuat".to_string()),
            description: Set(format!(
                "Order baru dibuat oleh {}. Total: Rp {}",
                actor,
                format_rupiah(ledger.grand_total)
            )),
            status: Set(input.current_status.to_string()),
            actor_name: Set(Some(actor)),
            created_at: Set(now),
        }
        .insert(&txn)
        .await
        .map_err(|e| {
            error!(error = %e, order_id = %order_id, "Failed to insert initial history entry");
            ServiceError::DatabaseError(e)
        })?;

        txn.commit().await.map_err(|e| {
            error!(error = %e, order_id = %order_id, "Failed to commit order creation");
            ServiceError::DatabaseError(e)
        })?;

        info!(order_id = %order_id, order_number = %order_number, "Order created");
        self.emit(Event::OrderCreated {
            order_id,
            order_number,
        })
        .await;

        let items = self.items_for(order_id).await?;
        Ok(OrderWithItems {
            order: order_model,
            items,
        })
    }

    /// Edit flow: diffs against the stored state, replaces the whole item
    /// set, and appends the generated change-log as a history entry. One
    /// transaction; last writer wins between concurrent edits.
    #[instrument(skip(self, input), fields(order_number = %order_number))]
    pub async fn edit_order(
        &self,
        order_number: &str,
        input: EditOrderInput,
    ) -> Result<OrderWithItems, ServiceError> {
        if input.client_name.trim().is_empty() {
            return Err(ServiceError::ValidationError(
                "Nama Klien wajib diisi.".to_string(),
            ));
        }
        validate_items(&input.items)?;
        if input.dp_amount < 0 {
            return Err(ServiceError::ValidationError(
                "DP tidak boleh negatif.".to_string(),
            ));
        }

        let db = &*self.db_pool;
        let existing = self
            .find_by_order_number(order_number)
            .await?
            .ok_or_else(|| {
                warn!(order_number = %order_number, "Order not found for edit");
                ServiceError::NotFound(format!("Order with number {order_number} not found"))
            })?;
        let existing_items = self.items_for(existing.id).await?;

        // Snapshot of the stored state, diffed against the incoming edit.
        let original = OrderSnapshot {
            client_name: existing.client_name.clone(),
            client_phone: existing.client_phone.clone().unwrap_or_default(),
            current_status: parse_stored_status(&existing.current_status)?,
            estimated_date: existing.estimated_date,
            dp_amount: existing.dp_amount,
            items: existing_items
                .iter()
                .map(|i| (i.quantity, i.price_per_unit))
                .collect(),
        };
        let current = OrderSnapshot {
            client_name: input.client_name.clone(),
            client_phone: input.client_phone.clone(),
            current_status: input.current_status,
            estimated_date: input.estimated_date,
            dp_amount: input.dp_amount,
            items: input
                .items
                .iter()
                .map(|i| (i.quantity, i.price_per_unit))
                .collect(),
        };

        let actor = input
            .actor_name
            .clone()
            .filter(|a| !a.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_ACTOR.to_string());
        let history_description = generate_change_log(&original, &current, &actor);

        let ledger = Ledger::compute(
            input.items.iter().map(|i| (i.quantity, i.price_per_unit)),
            input.dp_amount,
        );

        let order_id = existing.id;
        let txn = db.begin().await.map_err(|e| {
            error!(error = %e, order_id = %order_id, "Failed to start transaction for edit");
            ServiceError::DatabaseError(e)
        })?;

        let mut active: OrderActiveModel = existing.into();
        active.client_name = Set(input.client_name.clone());
        active.client_phone = Set(if input.client_phone.trim().is_empty() {
            None
        } else {
            Some(input.client_phone.clone())
        });
        active.current_status = Set(input.current_status.to_string());
        active.estimated_date = Set(input.estimated_date);
        active.grand_total = Set(ledger.grand_total);
        active.dp_amount = Set(ledger.dp_amount);
        active.remaining_balance = Set(ledger.remaining_balance);
        let updated = active.update(&txn).await.map_err(|e| {
            error!(error = %e, order_id = %order_id, "Failed to update order header");
            ServiceError::DatabaseError(e)
        })?;

        // Full replace: delete everything, reinsert the submitted list.
        OrderItemEntity::delete_many()
            .filter(order_item::Column::OrderId.eq(order_id))
            .exec(&txn)
            .await
            .map_err(|e| {
                error!(error = %e, order_id = %order_id, "Failed to clear order items");
                ServiceError::DatabaseError(e)
            })?;
        insert_items(&txn, order_id, &input.items).await?;

        HistoryActiveModel {
            id: Set(Uuid::new_v4()),
            order_id: Set(order_id),
            title: Set("Order Diperbarui".to_string()),
            description: Set(history_description),
            status: Set(input.current_status.to_string()),
            actor_name: Set(Some(actor)),
            created_at: Set(Utc::now()),
        }
        .insert(&txn)
        .await
        .map_err(|e| {
            error!(error = %e, order_id = %order_id, "Failed to insert edit history entry");
            ServiceError::DatabaseError(e)
        })?;

        txn.commit().await.map_err(|e| {
            error!(error = %e, order_id = %order_id, "Failed to commit order edit");
            ServiceError::DatabaseError(e)
        })?;

        info!(order_id = %order_id, order_number = %order_number, "Order edited");
        self.emit(Event::OrderUpdated {
            order_id,
            order_number: order_number.to_string(),
        })
        .await;

        let items = self.items_for(order_id).await?;
        Ok(OrderWithItems {
            order: updated,
            items,
        })
    }

    /// Status transition: updates only the status column and appends one
    /// history entry with the canned title for the new status.
    #[instrument(skip(self), fields(order_number = %order_number, new_status = %status))]
    pub async fn update_status(
        &self,
        order_number: &str,
        status: OrderStatus,
        description: Option<String>,
    ) -> Result<(), ServiceError> {
        let db = &*self.db_pool;
        let existing = self
            .find_by_order_number(order_number)
            .await?
            .ok_or_else(|| {
                warn!(order_number = %order_number, "Order not found for status update");
                ServiceError::NotFound("Order not found".to_string())
            })?;

        let order_id = existing.id;
        let old_status = existing.current_status.clone();

        let txn = db.begin().await.map_err(|e| {
            error!(error = %e, order_id = %order_id, "Failed to start transaction for status update");
            ServiceError::DatabaseError(e)
        })?;

        let mut active: OrderActiveModel = existing.into();
        active.current_status = Set(status.to_string());
        active.update(&txn).await.map_err(|e| {
            error!(error = %e, order_id = %order_id, "Failed to update order status");
            ServiceError::DatabaseError(e)
        })?;

        HistoryActiveModel {
            id: Set(Uuid::new_v4()),
            order_id: Set(order_id),
            title: Set(status.history_title().to_string()),
            description: Set(
                description.unwrap_or_else(|| format!("Status diubah ke: {status}"))
            ),
            status: Set(status.to_string()),
            actor_name: Set(None),
            created_at: Set(Utc::now()),
        }
        .insert(&txn)
        .await
        .map_err(|e| {
            error!(error = %e, order_id = %order_id, "Failed to insert status history entry");
            ServiceError::DatabaseError(e)
        })?;

        txn.commit().await.map_err(|e| {
            error!(error = %e, order_id = %order_id, "Failed to commit status update");
            ServiceError::DatabaseError(e)
        })?;

        info!(order_id = %order_id, old_status = %old_status, new_status = %status, "Order status updated");
        self.emit(Event::OrderStatusChanged {
            order_id,
            old_status,
            new_status: status.to_string(),
        })
        .await;

        Ok(())
    }

    /// Pay-off: moves the remaining balance into the cumulative deposit.
    /// A settled order is left untouched. The grand total is never
    /// recomputed here; items are unchanged.
    #[instrument(skip(self), fields(order_number = %order_number))]
    pub async fn pay_off(&self, order_number: &str) -> Result<OrderModel, ServiceError> {
        let db = &*self.db_pool;
        let existing = self
            .find_by_order_number(order_number)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Order with number {order_number} not found"))
            })?;

        if existing.remaining_balance <= 0 {
            info!(order_id = %existing.id, "Pay-off requested on settled order; nothing to do");
            return Ok(existing);
        }

        let order_id = existing.id;
        let new_dp = existing.dp_amount + existing.remaining_balance;
        let status_snapshot = existing.current_status.clone();

        let txn = db.begin().await.map_err(|e| {
            error!(error = %e, order_id = %order_id, "Failed to start transaction for pay-off");
            ServiceError::DatabaseError(e)
        })?;

        let mut active: OrderActiveModel = existing.into();
        active.dp_amount = Set(new_dp);
        active.remaining_balance = Set(0);
        let updated = active.update(&txn).await.map_err(|e| {
            error!(error = %e, order_id = %order_id, "Failed to apply pay-off");
            ServiceError::DatabaseError(e)
        })?;

        HistoryActiveModel {
            id: Set(Uuid::new_v4()),
            order_id: Set(order_id),
            title: Set("Pelunasan Pembayaran".to_string()),
            description: Set(format!(
                "Pembayaran lunas via Admin. Total masuk: Rp {}.",
                format_rupiah(new_dp)
            )),
            status: Set(status_snapshot),
            actor_name: Set(None),
            created_at: Set(Utc::now()),
        }
        .insert(&txn)
        .await
        .map_err(|e| {
            error!(error = %e, order_id = %order_id, "Failed to insert pay-off history entry");
            ServiceError::DatabaseError(e)
        })?;

        txn.commit().await.map_err(|e| {
            error!(error = %e, order_id = %order_id, "Failed to commit pay-off");
            ServiceError::DatabaseError(e)
        })?;

        info!(order_id = %order_id, dp_amount = new_dp, "Order paid off");
        self.emit(Event::OrderPaidOff {
            order_id,
            dp_amount: new_dp,
        })
        .await;

        Ok(updated)
    }

    /// Hard delete; items and history go with the order via FK cascade.
    #[instrument(skip(self), fields(order_number = %order_number))]
    pub async fn delete_order(&self, order_number: &str) -> Result<(), ServiceError> {
        let db = &*self.db_pool;
        let existing = self
            .find_by_order_number(order_number)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Order with number {order_number} not found"))
            })?;

        let order_id = existing.id;
        OrderEntity::delete_by_id(order_id)
            .exec(db)
            .await
            .map_err(|e| {
                error!(error = %e, order_id = %order_id, "Failed to delete order");
                ServiceError::DatabaseError(e)
            })?;

        info!(order_id = %order_id, order_number = %order_number, "Order deleted");
        self.emit(Event::OrderDeleted {
            order_id,
            order_number: order_number.to_string(),
        })
        .await;

        Ok(())
    }

    /// All orders with their items, newest creation first.
    #[instrument(skip(self))]
    pub async fn list_orders(&self) -> Result<Vec<OrderWithItems>, ServiceError> {
        let db = &*self.db_pool;
        let rows = OrderEntity::find()
            .order_by_desc(order::Column::CreatedAt)
            .find_with_related(OrderItemEntity)
            .all(db)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to list orders");
                ServiceError::DatabaseError(e)
            })?;

        Ok(rows
            .into_iter()
            .map(|(order, items)| OrderWithItems { order, items })
            .collect())
    }

    pub async fn find_by_order_number(
        &self,
        order_number: &str,
    ) -> Result<Option<OrderModel>, ServiceError> {
        let db = &*self.db_pool;
        OrderEntity::find()
            .filter(order::Column::OrderNumber.eq(order_number))
            .one(db)
            .await
            .map_err(ServiceError::DatabaseError)
    }

    /// One order with items and history (newest first) for a reference
    /// that is an order number or, failing that and only when it looks
    /// id-shaped, an internal id.
    #[instrument(skip(self), fields(reference = %reference))]
    pub async fn get_order_details(
        &self,
        reference: &str,
    ) -> Result<Option<OrderDetails>, ServiceError> {
        let db = &*self.db_pool;

        let mut found = self.find_by_order_number(reference).await?;
        if found.is_none() && reference.len() > 20 {
            if let Ok(id) = Uuid::from_str(reference) {
                found = OrderEntity::find_by_id(id)
                    .one(db)
                    .await
                    .map_err(ServiceError::DatabaseError)?;
            }
        }

        let Some(order) = found else {
            return Ok(None);
        };

        let items = self.items_for(order.id).await?;
        let history = HistoryEntity::find()
            .filter(order_history::Column::OrderId.eq(order.id))
            .order_by_desc(order_history::Column::CreatedAt)
            .all(db)
            .await
            .map_err(ServiceError::DatabaseError)?;

        Ok(Some(OrderDetails {
            order,
            items,
            history,
        }))
    }

    pub async fn get_order_with_items(
        &self,
        order_number: &str,
    ) -> Result<Option<OrderWithItems>, ServiceError> {
        let Some(order) = self.find_by_order_number(order_number).await? else {
            return Ok(None);
        };
        let items = self.items_for(order.id).await?;
        Ok(Some(OrderWithItems { order, items }))
    }

    async fn items_for(&self, order_id: Uuid) -> Result<Vec<OrderItemModel>, ServiceError> {
        let db = &*self.db_pool;
        OrderItemEntity::find()
            .filter(order_item::Column::OrderId.eq(order_id))
            .all(db)
            .await
            .map_err(ServiceError::DatabaseError)
    }

    async fn emit(&self, event: Event) {
        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender.send(event).await {
                warn!(error = %e, "Failed to send domain event");
            }
        }
    }
}

/// Rejects the whole submission when any line is unusable; an order must
/// always carry at least one item.
fn validate_items(items: &[OrderItemInput]) -> Result<(), ServiceError> {
    if items.is_empty() {
        return Err(ServiceError::ValidationError(
            "Pesanan harus memiliki minimal satu item.".to_string(),
        ));
    }
    for item in items {
        if item.product_name.trim().is_empty() {
            return Err(ServiceError::ValidationError(
                "Nama Produk tidak boleh kosong.".to_string(),
            ));
        }
        if item.quantity < 1 {
            return Err(ServiceError::ValidationError("Qty minimal 1.".to_string()));
        }
        if item.price_per_unit < 0 {
            return Err(ServiceError::ValidationError(
                "Harga satuan tidak boleh negatif.".to_string(),
            ));
        }
    }
    Ok(())
}

async fn insert_items(
    txn: &sea_orm::DatabaseTransaction,
    order_id: Uuid,
    items: &[OrderItemInput],
) -> Result<(), ServiceError> {
    let models: Vec<OrderItemActiveModel> = items
        .iter()
        .map(|item| OrderItemActiveModel {
            id: Set(Uuid::new_v4()),
            order_id: Set(order_id),
            product_name: Set(item.product_name.clone()),
            category: Set(item.category.to_string()),
            quantity: Set(item.quantity),
            notes: Set(item.notes.clone()),
            price_per_unit: Set(item.price_per_unit),
            total_price: Set(line_total(item.quantity, item.price_per_unit)),
        })
        .collect();

    OrderItemEntity::insert_many(models)
        .exec(txn)
        .await
        .map_err(|e| {
            error!(error = %e, order_id = %order_id, "Failed to insert order items");
            ServiceError::DatabaseError(e)
        })?;
    Ok(())
}

fn parse_stored_status(raw: &str) -> Result<OrderStatus, ServiceError> {
    OrderStatus::from_str(raw)
        .map_err(|_| ServiceError::InternalError(format!("Stored status '{raw}' is not recognized")))
}

fn generate_order_number() -> String {
    let now = Utc::now();
    let suffix: u32 = rand::thread_rng().gen_range(0..10_000);
    format!("INV-{}-{suffix:04}", now.format("%Y%m"))
}
