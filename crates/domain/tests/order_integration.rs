//! Integration tests for the order lifecycle.
//!
//! These tests drive the services end to end against the in-memory store and
//! check the per-client confirmed sum after every step.

use domain::{
    ClientId, ClientService, CreateOrder, DomainError, NewClient, NewOrderItem, NewProduct,
    OrderError, OrderService, OrdersByClientService, ProductId, ProductService, UpdateOrder,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use store::InMemoryStore;

struct Services {
    store: InMemoryStore,
    orders: OrderService<InMemoryStore>,
    clients: ClientService<InMemoryStore>,
    products: ProductService<InMemoryStore>,
    sums: OrdersByClientService<InMemoryStore>,
}

fn create_services() -> Services {
    let store = InMemoryStore::new();
    Services {
        orders: OrderService::new(store.clone()),
        clients: ClientService::new(store.clone()),
        products: ProductService::new(store.clone()),
        sums: OrdersByClientService::new(store.clone()),
        store,
    }
}

async fn seed(services: &Services) -> (ClientId, ProductId) {
    let client = services
        .clients
        .create(NewClient {
            name: "Acme".to_string(),
            tax_id: "7701".to_string(),
        })
        .await
        .unwrap();
    let product = services
        .products
        .create(NewProduct {
            name: "Bolt".to_string(),
            unit: "pcs".to_string(),
        })
        .await
        .unwrap();
    (client.id, product.id)
}

async fn confirmed_sum(services: &Services, client_id: ClientId) -> Option<Decimal> {
    match services.sums.get(client_id).await {
        Ok(row) => Some(row.orders_sum),
        Err(DomainError::NotFound { .. }) => None,
        Err(err) => panic!("unexpected error: {err}"),
    }
}

mod order_lifecycle {
    use super::*;

    #[tokio::test]
    async fn confirm_and_delete_move_the_client_sum() {
        let services = create_services();
        let (client_id, product_id) = seed(&services).await;

        let first = services
            .orders
            .create_order(CreateOrder::new(
                client_id,
                "A-1",
                vec![
                    NewOrderItem::new(product_id, dec!(2), dec!(10.00)),
                    NewOrderItem::new(product_id, dec!(1), dec!(5.00)),
                ],
            ))
            .await
            .unwrap();
        assert_eq!(first.total_amount, dec!(25.00));
        assert!(!first.is_confirmed);
        assert_eq!(first.items.len(), 2);
        assert_eq!(confirmed_sum(&services, client_id).await, None);

        let confirmed = services.orders.confirm_order(first.id).await.unwrap();
        assert!(confirmed.is_confirmed);
        assert_eq!(confirmed_sum(&services, client_id).await, Some(dec!(25.00)));

        let second = services
            .orders
            .create_order(CreateOrder::new(
                client_id,
                "A-2",
                vec![NewOrderItem::new(product_id, dec!(1), dec!(10.00))],
            ))
            .await
            .unwrap();
        services.orders.confirm_order(second.id).await.unwrap();
        assert_eq!(confirmed_sum(&services, client_id).await, Some(dec!(35.00)));

        services.orders.delete_order(first.id).await.unwrap();
        assert_eq!(confirmed_sum(&services, client_id).await, Some(dec!(10.00)));
        assert_eq!(services.store.order_count().await, 1);
    }

    #[tokio::test]
    async fn fractional_quantities_are_exact() {
        let services = create_services();
        let (client_id, product_id) = seed(&services).await;

        let order = services
            .orders
            .create_order(CreateOrder::new(
                client_id,
                "A-1",
                vec![NewOrderItem::new(product_id, dec!(1.5), dec!(3.33))],
            ))
            .await
            .unwrap();

        assert_eq!(order.items[0].line_amount, dec!(4.995));
        assert_eq!(order.total_amount, dec!(4.995));
        assert_eq!(order.items_total(), order.total_amount);
    }

    #[tokio::test]
    async fn deleting_an_unconfirmed_order_leaves_the_sum_alone() {
        let services = create_services();
        let (client_id, product_id) = seed(&services).await;

        let confirmed = services
            .orders
            .create_order(CreateOrder::new(
                client_id,
                "A-1",
                vec![NewOrderItem::new(product_id, dec!(1), dec!(7.00))],
            ))
            .await
            .unwrap();
        services.orders.confirm_order(confirmed.id).await.unwrap();

        let draft = services
            .orders
            .create_order(CreateOrder::new(
                client_id,
                "A-2",
                vec![NewOrderItem::new(product_id, dec!(3), dec!(4.00))],
            ))
            .await
            .unwrap();
        services.orders.delete_order(draft.id).await.unwrap();

        assert_eq!(confirmed_sum(&services, client_id).await, Some(dec!(7.00)));
        assert!(matches!(
            services.orders.get_order(draft.id).await,
            Err(DomainError::NotFound { entity: "order", .. })
        ));
    }

    #[tokio::test]
    async fn listings_are_most_recent_first() {
        let services = create_services();
        let (client_id, product_id) = seed(&services).await;

        let mut ids = Vec::new();
        for number in ["A-1", "A-2", "A-3"] {
            let order = services
                .orders
                .create_order(CreateOrder::new(
                    client_id,
                    number,
                    vec![NewOrderItem::new(product_id, dec!(1), dec!(1.00))],
                ))
                .await
                .unwrap();
            ids.push(order.id);
        }
        ids.reverse();

        let listed: Vec<_> = services
            .orders
            .list_orders()
            .await
            .unwrap()
            .into_iter()
            .map(|o| o.id)
            .collect();
        assert_eq!(listed, ids);

        let for_client = services.orders.list_client_orders(client_id).await.unwrap();
        assert_eq!(for_client.len(), 3);
        assert!(for_client.iter().all(|o| o.client.name == "Acme"));
    }
}

mod validation {
    use super::*;

    #[tokio::test]
    async fn order_without_items_is_rejected_and_not_persisted() {
        let services = create_services();
        let (client_id, _) = seed(&services).await;

        let result = services
            .orders
            .create_order(CreateOrder::new(client_id, "A-1", vec![]))
            .await;

        assert!(matches!(
            result,
            Err(DomainError::Order(OrderError::NoItems))
        ));
        assert_eq!(services.store.order_count().await, 0);
    }

    #[tokio::test]
    async fn invalid_quantity_is_rejected() {
        let services = create_services();
        let (client_id, product_id) = seed(&services).await;

        let result = services
            .orders
            .create_order(CreateOrder::new(
                client_id,
                "A-1",
                vec![NewOrderItem::new(product_id, dec!(0), dec!(10.00))],
            ))
            .await;

        assert!(matches!(
            result,
            Err(DomainError::Order(OrderError::InvalidQuantity { .. }))
        ));
        assert_eq!(services.store.order_count().await, 0);
    }

    #[tokio::test]
    async fn oversized_values_are_rejected_without_panicking() {
        let services = create_services();
        let (client_id, product_id) = seed(&services).await;

        let result = services
            .orders
            .create_order(CreateOrder::new(
                client_id,
                "A-1",
                vec![NewOrderItem::new(product_id, Decimal::MAX, dec!(2))],
            ))
            .await;
        assert!(matches!(
            result,
            Err(DomainError::Order(OrderError::InvalidQuantity { .. }))
        ));

        let largest =
            NewOrderItem::new(product_id, dec!(999999999999.999), dec!(9999999999999.99));
        let result = services
            .orders
            .create_order(CreateOrder::new(client_id, "A-2", vec![largest; 8000]))
            .await;
        assert!(matches!(
            result,
            Err(DomainError::Order(OrderError::AmountOutOfRange))
        ));
        assert_eq!(services.store.order_count().await, 0);
    }

    #[tokio::test]
    async fn blank_number_is_a_validation_error() {
        let services = create_services();
        let (client_id, product_id) = seed(&services).await;

        let result = services
            .orders
            .create_order(CreateOrder::new(
                client_id,
                "   ",
                vec![NewOrderItem::new(product_id, dec!(1), dec!(1.00))],
            ))
            .await;

        assert!(matches!(result, Err(DomainError::Validation(_))));
    }

    #[tokio::test]
    async fn unknown_client_or_product_is_not_found() {
        let services = create_services();
        let (client_id, product_id) = seed(&services).await;

        let result = services
            .orders
            .create_order(CreateOrder::new(
                ClientId::new(999),
                "A-1",
                vec![NewOrderItem::new(product_id, dec!(1), dec!(1.00))],
            ))
            .await;
        assert!(matches!(
            result,
            Err(DomainError::NotFound { entity: "client", id: 999 })
        ));

        let result = services
            .orders
            .create_order(CreateOrder::new(
                client_id,
                "A-1",
                vec![NewOrderItem::new(ProductId::new(999), dec!(1), dec!(1.00))],
            ))
            .await;
        assert!(matches!(
            result,
            Err(DomainError::NotFound { entity: "product", id: 999 })
        ));
        assert_eq!(services.store.order_count().await, 0);
        assert_eq!(services.store.item_count().await, 0);
    }

    #[tokio::test]
    async fn duplicate_number_is_a_conflict() {
        let services = create_services();
        let (client_id, product_id) = seed(&services).await;
        let items = vec![NewOrderItem::new(product_id, dec!(1), dec!(1.00))];

        services
            .orders
            .create_order(CreateOrder::new(client_id, "A-1", items.clone()))
            .await
            .unwrap();
        let result = services
            .orders
            .create_order(CreateOrder::new(client_id, "A-1", items))
            .await;

        assert!(matches!(result, Err(DomainError::Conflict(_))));
        assert_eq!(services.store.order_count().await, 1);
    }
}

mod confirmation {
    use super::*;

    #[tokio::test]
    async fn second_confirm_fails_and_sum_is_unchanged() {
        let services = create_services();
        let (client_id, product_id) = seed(&services).await;

        let order = services
            .orders
            .create_order(CreateOrder::new(
                client_id,
                "A-1",
                vec![NewOrderItem::new(product_id, dec!(2), dec!(10.00))],
            ))
            .await
            .unwrap();
        services.orders.confirm_order(order.id).await.unwrap();

        let result = services.orders.confirm_order(order.id).await;
        assert!(matches!(
            result,
            Err(DomainError::Order(OrderError::AlreadyConfirmed { .. }))
        ));
        assert_eq!(confirmed_sum(&services, client_id).await, Some(dec!(20.00)));
    }

    #[tokio::test]
    async fn concurrent_confirms_count_once() {
        let services = create_services();
        let (client_id, product_id) = seed(&services).await;

        let order = services
            .orders
            .create_order(CreateOrder::new(
                client_id,
                "A-1",
                vec![NewOrderItem::new(product_id, dec!(3), dec!(5.00))],
            ))
            .await
            .unwrap();

        let (a, b) = tokio::join!(
            services.orders.confirm_order(order.id),
            services.orders.confirm_order(order.id)
        );

        assert_eq!([a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count(), 1);
        assert_eq!(confirmed_sum(&services, client_id).await, Some(dec!(15.00)));
    }

    #[tokio::test]
    async fn concurrent_confirms_of_two_orders_add_both_totals() {
        let services = create_services();
        let (client_id, product_id) = seed(&services).await;

        let first = services
            .orders
            .create_order(CreateOrder::new(
                client_id,
                "A-1",
                vec![NewOrderItem::new(product_id, dec!(2), dec!(10.00))],
            ))
            .await
            .unwrap();
        let second = services
            .orders
            .create_order(CreateOrder::new(
                client_id,
                "A-2",
                vec![NewOrderItem::new(product_id, dec!(1.5), dec!(3.33))],
            ))
            .await
            .unwrap();

        let (a, b) = tokio::join!(
            services.orders.confirm_order(first.id),
            services.orders.confirm_order(second.id)
        );
        a.unwrap();
        b.unwrap();

        assert_eq!(
            confirmed_sum(&services, client_id).await,
            Some(dec!(24.995))
        );
    }

    #[tokio::test]
    async fn confirming_a_missing_order_is_not_found() {
        let services = create_services();
        let result = services.orders.confirm_order(domain::OrderId::new(42)).await;
        assert!(matches!(
            result,
            Err(DomainError::NotFound { entity: "order", id: 42 })
        ));
    }
}

mod editing {
    use super::*;

    #[tokio::test]
    async fn update_replaces_items_and_total() {
        let services = create_services();
        let (client_id, product_id) = seed(&services).await;

        let order = services
            .orders
            .create_order(CreateOrder::new(
                client_id,
                "A-1",
                vec![
                    NewOrderItem::new(product_id, dec!(1), dec!(1.00)),
                    NewOrderItem::new(product_id, dec!(2), dec!(1.00)),
                ],
            ))
            .await
            .unwrap();

        let updated = services
            .orders
            .update_order(
                order.id,
                UpdateOrder::new()
                    .number("A-1b")
                    .items(vec![NewOrderItem::new(product_id, dec!(4), dec!(2.50))]),
            )
            .await
            .unwrap();

        assert_eq!(updated.number, "A-1b");
        assert_eq!(updated.items.len(), 1);
        assert_eq!(updated.total_amount, dec!(10.00));
        assert_eq!(services.store.item_count().await, 1);
    }

    #[tokio::test]
    async fn empty_items_leave_the_item_set_untouched() {
        let services = create_services();
        let (client_id, product_id) = seed(&services).await;
        let other = services
            .clients
            .create(NewClient {
                name: "Globex".to_string(),
                tax_id: String::new(),
            })
            .await
            .unwrap();

        let order = services
            .orders
            .create_order(CreateOrder::new(
                client_id,
                "A-1",
                vec![NewOrderItem::new(product_id, dec!(2), dec!(3.00))],
            ))
            .await
            .unwrap();

        let updated = services
            .orders
            .update_order(order.id, UpdateOrder::new().client(other.id).items(vec![]))
            .await
            .unwrap();

        assert_eq!(updated.client_id, other.id);
        assert_eq!(updated.client.name, "Globex");
        assert_eq!(updated.number, "A-1");
        assert_eq!(updated.items.len(), 1);
        assert_eq!(updated.total_amount, dec!(6.00));
    }

    #[tokio::test]
    async fn confirmed_order_cannot_be_edited() {
        let services = create_services();
        let (client_id, product_id) = seed(&services).await;

        let order = services
            .orders
            .create_order(CreateOrder::new(
                client_id,
                "A-1",
                vec![NewOrderItem::new(product_id, dec!(1), dec!(9.00))],
            ))
            .await
            .unwrap();
        services.orders.confirm_order(order.id).await.unwrap();

        let result = services
            .orders
            .update_order(
                order.id,
                UpdateOrder::new().items(vec![NewOrderItem::new(product_id, dec!(0), dec!(1))]),
            )
            .await;

        assert!(matches!(
            result,
            Err(DomainError::Order(OrderError::ConfirmedImmutable { .. }))
        ));
        let stored = services.orders.get_order(order.id).await.unwrap();
        assert_eq!(stored.total_amount, dec!(9.00));
        assert_eq!(confirmed_sum(&services, client_id).await, Some(dec!(9.00)));
    }
}

mod catalogue {
    use super::*;

    #[tokio::test]
    async fn referenced_client_and_product_cannot_be_deleted() {
        let services = create_services();
        let (client_id, product_id) = seed(&services).await;

        let order = services
            .orders
            .create_order(CreateOrder::new(
                client_id,
                "A-1",
                vec![NewOrderItem::new(product_id, dec!(1), dec!(1.00))],
            ))
            .await
            .unwrap();

        assert!(matches!(
            services.clients.delete(client_id).await,
            Err(DomainError::Conflict(_))
        ));
        assert!(matches!(
            services.products.delete(product_id).await,
            Err(DomainError::Conflict(_))
        ));

        let items = services.products.list_order_items(product_id).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].order_id, order.id);

        services.orders.delete_order(order.id).await.unwrap();
        services.products.delete(product_id).await.unwrap();
        services.clients.delete(client_id).await.unwrap();
        assert!(services.clients.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn required_fields_are_trimmed_and_checked() {
        let services = create_services();

        let client = services
            .clients
            .create(NewClient {
                name: "  Acme  ".to_string(),
                tax_id: String::new(),
            })
            .await
            .unwrap();
        assert_eq!(client.name, "Acme");

        assert!(matches!(
            services
                .products
                .create(NewProduct {
                    name: "Bolt".to_string(),
                    unit: " ".to_string(),
                })
                .await,
            Err(DomainError::Validation(_))
        ));

        let renamed = services
            .clients
            .update(
                client.id,
                NewClient {
                    name: "Acme Corp".to_string(),
                    tax_id: "1".to_string(),
                },
            )
            .await
            .unwrap();
        assert_eq!(renamed.name, "Acme Corp");
        assert!(matches!(
            services
                .clients
                .update(
                    ClientId::new(999),
                    NewClient {
                        name: "x".to_string(),
                        tax_id: String::new(),
                    },
                )
                .await,
            Err(DomainError::NotFound { .. })
        ));
    }
}
