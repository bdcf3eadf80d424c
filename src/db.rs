pub mod customer_repo;
pub use customer_repo::CustomerRepository;
pub mod product_repo;
pub use product_repo::ProductRepository;
pub mod sale_repo;
pub use sale_repo::SaleRepository;
pub mod installment_repo;
pub use installment_repo::InstallmentRepository;
pub mod lead_repo;
pub use lead_repo::LeadRepository;
pub mod notification_repo;
pub use notification_repo::NotificationRepository;
