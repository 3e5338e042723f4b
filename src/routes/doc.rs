use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        admin::{
            AdminOrderDetail, AdminOrderList, AdminOrderSummary, CustomerList, CustomerSummary,
            StatsResponse, StatusBreakdown, UpdateOrderStatusRequest, UpdateOrderStatusResponse,
        },
        auth::{LoginRequest, LoginResponse, SignupRequest, SignupResponse},
        cart::{AddToCartRequest, CartItemDto, CartList, UpdateCartItemRequest},
        orders::{
            CheckoutRequest, CheckoutResponse, OrderItemDetail, OrderList, OrderWithItems,
            PaymentMethod,
        },
        products,
        settings::UpdateSettingsRequest,
        users::{ChangePasswordRequest, OrderStats, UpdateProfileRequest, UserProfile},
    },
    models::{CartItem, Order, OrderItem, Product, StoreSettings, User},
    response::{ApiResponse, Meta},
    routes::{admin, auth, cart, health, orders, params, products as product_routes, profile, settings},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::signup,
        auth::login,
        profile::get_profile,
        profile::update_profile,
        profile::change_password,
        product_routes::list_products,
        product_routes::get_product,
        cart::cart_list,
        cart::add_to_cart,
        cart::update_cart_item,
        cart::remove_from_cart,
        orders::checkout,
        orders::list_my_orders,
        orders::get_order,
        settings::get_settings,
        admin::stats,
        admin::list_users,
        admin::list_all_orders,
        admin::get_order_admin,
        admin::update_order_status,
        admin::list_all_products,
        admin::create_product,
        admin::update_product,
        admin::delete_product,
        admin::get_settings_admin,
        admin::update_settings
    ),
    components(
        schemas(
            User,
            Product,
            CartItem,
            Order,
            OrderItem,
            StoreSettings,
            SignupRequest,
            SignupResponse,
            LoginRequest,
            LoginResponse,
            UserProfile,
            OrderStats,
            UpdateProfileRequest,
            ChangePasswordRequest,
            AddToCartRequest,
            UpdateCartItemRequest,
            CartItemDto,
            CartList,
            PaymentMethod,
            CheckoutRequest,
            CheckoutResponse,
            OrderItemDetail,
            OrderWithItems,
            OrderList,
            StatsResponse,
            StatusBreakdown,
            CustomerSummary,
            CustomerList,
            AdminOrderSummary,
            AdminOrderList,
            AdminOrderDetail,
            UpdateOrderStatusRequest,
            UpdateOrderStatusResponse,
            UpdateSettingsRequest,
            products::ProductList,
            params::Pagination,
            params::ProductQuery,
            params::OrderListQuery,
            Meta,
            ApiResponse<Product>,
            ApiResponse<products::ProductList>,
            ApiResponse<OrderWithItems>,
            ApiResponse<OrderList>,
            ApiResponse<CartList>,
            ApiResponse<StoreSettings>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Authentication endpoints"),
        (name = "Profile", description = "Profile endpoints"),
        (name = "Products", description = "Catalog endpoints"),
        (name = "Cart", description = "Cart endpoints"),
        (name = "Orders", description = "Order endpoints"),
        (name = "Settings", description = "Store settings endpoints"),
        (name = "Admin", description = "Back-office endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
