//! Shared ledger fixtures for the integration tests.

#![allow(dead_code)]

use chrono::NaiveDate;
use sales_analytics::{Dataset, Transaction};

pub const EPS: f64 = 1e-9;

pub fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < EPS
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Builder-style fixture for a single ledger line.
pub struct Line {
    tx: Transaction,
}

pub fn line(order: &str, customer: &str, product: &str) -> Line {
    Line {
        tx: Transaction {
            order_id: order.to_string(),
            customer_id: customer.to_string(),
            order_date: date(2024, 1, 15),
            product_id: product.to_string(),
            category: "Office Supplies".to_string(),
            sub_category: "Binders".to_string(),
            region: "East".to_string(),
            segment: "Consumer".to_string(),
            sales: 100.0,
            discount: 0.0,
            profit: 10.0,
            quantity: 1,
        },
    }
}

impl Line {
    pub fn on(mut self, y: i32, m: u32, d: u32) -> Self {
        self.tx.order_date = date(y, m, d);
        self
    }

    pub fn category(mut self, category: &str, sub_category: &str) -> Self {
        self.tx.category = category.to_string();
        self.tx.sub_category = sub_category.to_string();
        self
    }

    pub fn region(mut self, region: &str) -> Self {
        self.tx.region = region.to_string();
        self
    }

    pub fn segment(mut self, segment: &str) -> Self {
        self.tx.segment = segment.to_string();
        self
    }

    pub fn money(mut self, sales: f64, profit: f64) -> Self {
        self.tx.sales = sales;
        self.tx.profit = profit;
        self
    }

    pub fn discount(mut self, discount: f64) -> Self {
        self.tx.discount = discount;
        self
    }

    pub fn quantity(mut self, quantity: i64) -> Self {
        self.tx.quantity = quantity;
        self
    }

    pub fn build(self) -> Transaction {
        self.tx
    }
}

/// A small superstore-like ledger spanning 2023-2024 with four regions.
pub fn sample_ledger() -> Vec<Transaction> {
    vec![
        line("CA-1001", "AB-100", "FUR-CH-1")
            .category("Furniture", "Chairs")
            .region("West")
            .money(731.94, 219.58)
            .quantity(3)
            .on(2023, 1, 8)
            .build(),
        line("CA-1001", "AB-100", "OFF-LA-1")
            .category("Office Supplies", "Labels")
            .region("West")
            .money(14.62, 6.87)
            .quantity(2)
            .on(2023, 1, 8)
            .build(),
        line("CA-1002", "CG-120", "FUR-TA-1")
            .category("Furniture", "Tables")
            .region("South")
            .money(957.58, -383.03)
            .discount(0.45)
            .quantity(5)
            .on(2023, 3, 11)
            .segment("Corporate")
            .build(),
        line("CA-1003", "DV-130", "TEC-PH-1")
            .category("Technology", "Phones")
            .region("East")
            .money(907.15, 90.72)
            .discount(0.2)
            .quantity(6)
            .on(2023, 6, 2)
            .build(),
        line("CA-1004", "DV-130", "OFF-BI-1")
            .category("Office Supplies", "Binders")
            .region("East")
            .money(18.50, 5.78)
            .discount(0.2)
            .quantity(3)
            .on(2023, 9, 20)
            .build(),
        line("CA-1005", "SO-140", "TEC-PH-1")
            .category("Technology", "Phones")
            .region("Central")
            .money(371.17, 41.91)
            .discount(0.2)
            .quantity(4)
            .on(2024, 2, 14)
            .segment("Home Office")
            .build(),
        line("CA-1006", "AB-100", "FUR-CH-1")
            .category("Furniture", "Chairs")
            .region("West")
            .money(243.98, 73.19)
            .quantity(1)
            .on(2024, 5, 30)
            .build(),
        line("CA-1007", "HP-150", "OFF-AP-1")
            .category("Office Supplies", "Appliances")
            .region("Central")
            .money(68.81, -123.86)
            .discount(0.8)
            .quantity(5)
            .on(2024, 7, 4)
            .segment("Corporate")
            .build(),
        line("CA-1008", "PK-160", "TEC-AC-1")
            .category("Technology", "Accessories")
            .region("South")
            .money(114.90, 34.47)
            .quantity(5)
            .on(2024, 11, 22)
            .build(),
        line("CA-1009", "CG-120", "OFF-LA-1")
            .category("Office Supplies", "Labels")
            .region("South")
            .money(29.24, 13.74)
            .quantity(4)
            .on(2024, 12, 27)
            .segment("Corporate")
            .build(),
    ]
}

pub fn sample_dataset() -> Dataset {
    Dataset::new(sample_ledger())
}
