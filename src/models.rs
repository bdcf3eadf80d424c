pub mod customer;
pub mod installment;
pub mod lead;
pub mod notification;
pub mod product;
pub mod report;
pub mod sale;
