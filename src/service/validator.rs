use bigdecimal::{BigDecimal, ToPrimitive, Zero};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::models::{
    InvoiceInput, InvoiceRow, NewProduct, PaymentType, ProductInput, ProductRow, RawRow,
    ValidInvoiceInput,
};

/// 单个字段的校验错误
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// 一行数据的全部字段错误（每个违规字段一条）
#[derive(Debug, Clone, Default, PartialEq, Eq, Error)]
#[error("validation failed on {} field(s)", .0.len())]
pub struct ValidationErrors(pub Vec<FieldError>);

impl ValidationErrors {
    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self(vec![FieldError {
            field: field.into(),
            message: message.into(),
        }])
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|e| e.field.as_str())
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.fields().any(|f| f == field)
    }

    pub fn messages(&self) -> Vec<String> {
        self.0.iter().map(ToString::to_string).collect()
    }
}

/// PostgreSQL NUMERIC 的位数上限（小数点前 / 后）
const MAX_AMOUNT_WHOLE_DIGITS: i64 = 131_072;
const MAX_AMOUNT_FRACTION_DIGITS: i64 = 16_383;

/// i32::MAX 的位数
const MAX_QUANTITY_DIGITS: i64 = 10;

/// 十进制数的位数特征，只做字符串计数，不做任何缩放
#[derive(Debug, PartialEq, Eq)]
struct DecimalShape {
    zero: bool,
    negative: bool,
    /// 整数部分的有效位数
    whole_digits: i64,
    /// 去掉末尾 0 后的小数位数
    fraction_digits: i64,
}

impl DecimalShape {
    fn of(v: &BigDecimal) -> Self {
        let (int, scale) = v.as_bigint_and_exponent();
        if int.is_zero() {
            return Self {
                zero: true,
                negative: false,
                whole_digits: 0,
                fraction_digits: 0,
            };
        }
        let text = int.to_string();
        let digits = text.trim_start_matches('-');
        let significant = digits.trim_end_matches('0').len();
        let trailing = (digits.len() - significant) as i64;
        // 数值 = 有效数字 * 10^exponent
        let exponent = trailing.saturating_sub(scale);
        Self {
            zero: false,
            negative: text.starts_with('-'),
            whole_digits: (significant as i64).saturating_add(exponent).max(0),
            fraction_digits: exponent.saturating_neg().max(0),
        }
    }
}

/// 逐字段收集错误，最后一次性返回
#[derive(Default)]
struct Checker {
    errors: Vec<FieldError>,
}

impl Checker {
    fn fail(&mut self, field: &str, message: impl Into<String>) {
        self.errors.push(FieldError {
            field: field.to_string(),
            message: message.into(),
        });
    }

    /// 必填文本 + 最小长度（按字符计）
    fn text(
        &mut self,
        field: &str,
        value: Option<&str>,
        label: &str,
        min_len: usize,
    ) -> Option<String> {
        match value {
            None | Some("") => {
                self.fail(field, format!("{} is required", label));
                None
            }
            Some(v) if v.chars().count() < min_len => {
                self.fail(
                    field,
                    format!("{} must be at least {} characters", label, min_len),
                );
                None
            }
            Some(v) => Some(v.to_string()),
        }
    }

    /// 可选文本: 出现时才检查最小长度
    fn optional_text(
        &mut self,
        field: &str,
        value: Option<&str>,
        label: &str,
        min_len: usize,
    ) -> Option<String> {
        let v = value?;
        if v.chars().count() < min_len {
            self.fail(
                field,
                format!("{} must be at least {} characters", label, min_len),
            );
            return None;
        }
        Some(v.to_string())
    }

    /// 正数金额，位数不超过 NUMERIC 列的上限
    fn positive_amount(&mut self, field: &str, value: Option<&BigDecimal>, label: &str) -> Option<BigDecimal> {
        let Some(v) = value else {
            self.fail(field, format!("{} is required", label));
            return None;
        };
        let shape = DecimalShape::of(v);
        if shape.zero || shape.negative {
            self.fail(field, format!("{} must be positive", label));
            return None;
        }
        if shape.whole_digits > MAX_AMOUNT_WHOLE_DIGITS {
            self.fail(field, format!("{} is too large", label));
            return None;
        }
        if shape.fraction_digits > MAX_AMOUNT_FRACTION_DIGITS {
            self.fail(field, format!("{} has too many decimal places", label));
            return None;
        }
        Some(v.clone())
    }

    /// 表格单元格 -> 正数金额
    fn positive_cell(&mut self, field: &str, raw: Option<&str>, label: &str) -> Option<BigDecimal> {
        let parsed = match raw {
            None => None,
            Some(s) => match BigDecimal::from_str(s.trim()) {
                Ok(v) => Some(v),
                Err(_) => {
                    self.fail(field, format!("{} must be a number", label));
                    return None;
                }
            },
        };
        self.positive_amount(field, parsed.as_ref(), label)
    }

    /// 表格单元格 -> 正整数数量（"2.0" 视为整数）
    fn quantity_cell(&mut self, field: &str, raw: Option<&str>) -> Option<i32> {
        let Some(s) = raw else {
            self.fail(field, "Quantity is required");
            return None;
        };
        let Ok(v) = BigDecimal::from_str(s.trim()) else {
            self.fail(field, "Quantity must be a number");
            return None;
        };
        // 只看位数，不缩放：`1e400000000` 之类的值缩放代价极高
        let shape = DecimalShape::of(&v);
        if shape.fraction_digits > 0 {
            self.fail(field, "Quantity must be an integer");
            return None;
        }
        if shape.zero || shape.negative {
            self.fail(field, "Quantity must be positive");
            return None;
        }
        if shape.whole_digits > MAX_QUANTITY_DIGITS {
            self.fail(field, "Quantity is too large");
            return None;
        }
        match v.to_i32() {
            Some(q) => Some(q),
            None => {
                self.fail(field, "Quantity is too large");
                None
            }
        }
    }

    fn finish<T>(self, value: impl FnOnce() -> Option<T>) -> Result<T, ValidationErrors> {
        if !self.errors.is_empty() {
            return Err(ValidationErrors(self.errors));
        }
        value().ok_or_else(ValidationErrors::default)
    }
}

fn cell<'a>(row: &'a RawRow, field: &str) -> Option<&'a str> {
    row.get(field).map(String::as_str)
}

/// 导入: 发票行校验
///
/// 不校验 payment_type，导入的发票一律按 `IMPORTED_PAYMENT_TYPE` 落库。
pub fn validate_invoice_row(row: &RawRow) -> Result<InvoiceRow, ValidationErrors> {
    let mut c = Checker::default();
    let invoice_no = c.text("invoice_no", cell(row, "invoice_no"), "Invoice number", 1);
    let customer_name = c.text("customer_name", cell(row, "customer_name"), "Customer name", 2);
    let salesperson = c.text("salesperson", cell(row, "salesperson"), "Salesperson name", 2);
    let notes = c.optional_text("notes", cell(row, "notes"), "Notes", 5);

    c.finish(|| {
        Some(InvoiceRow {
            invoice_no: invoice_no?,
            customer_name: customer_name?,
            salesperson: salesperson?,
            notes,
        })
    })
}

/// 导入: 明细行校验
pub fn validate_product_row(row: &RawRow) -> Result<ProductRow, ValidationErrors> {
    let mut c = Checker::default();
    let invoice_no = c.text("invoice_no", cell(row, "invoice_no"), "Invoice number", 1);
    let item = c.text("item", cell(row, "item"), "Item name", 5);
    let quantity = c.quantity_cell("quantity", cell(row, "quantity"));
    let total_cogs = c.positive_cell("total_cogs", cell(row, "total_cogs"), "Total COGS");
    let total_price = c.positive_cell("total_price", cell(row, "total_price"), "Total price");

    c.finish(|| {
        Some(ProductRow {
            invoice_no: invoice_no?,
            item: item?,
            quantity: quantity?,
            total_cogs: total_cogs?,
            total_price: total_price?,
        })
    })
}

/// 商品创建/更新校验
pub fn validate_product_input(input: &ProductInput) -> Result<NewProduct, ValidationErrors> {
    let mut c = Checker::default();
    let name = c.text("name", input.name.as_deref(), "Name", 5);
    let qty = match input.qty {
        None => {
            c.fail("qty", "Quantity is required");
            None
        }
        Some(q) if q < 1 => {
            c.fail("qty", "Quantity must be at least 1");
            None
        }
        Some(q) => match i32::try_from(q) {
            Ok(q) => Some(q),
            Err(_) => {
                c.fail("qty", "Quantity is too large");
                None
            }
        },
    };
    let total_cogs = c.positive_amount("total_cogs", input.total_cogs.as_ref(), "Total COGS");
    let total_price = c.positive_amount("total_price", input.total_price.as_ref(), "Total price");

    c.finish(|| {
        Some(NewProduct {
            name: name?,
            qty: qty?,
            total_cogs: total_cogs?,
            total_price: total_price?,
        })
    })
}

/// 发票创建/更新校验（纯内存）
///
/// 发票号唯一性、商品是否存在由 InvoiceService 在校验通过后单独检查。
/// `require_products` 为 true 时（创建）至少需要一个商品。
pub fn validate_invoice_input(
    input: &InvoiceInput,
    require_products: bool,
) -> Result<ValidInvoiceInput, ValidationErrors> {
    let mut c = Checker::default();
    let invoice_no = c.text("invoice_no", input.invoice_no.as_deref(), "Invoice number", 3);
    let customer_name = c.text(
        "customer_name",
        input.customer_name.as_deref(),
        "Customer name",
        2,
    );
    let salesperson = c.text(
        "salesperson",
        input.salesperson.as_deref(),
        "Salesperson name",
        2,
    );
    let payment_type = input.payment_type.as_deref().and_then(PaymentType::parse);
    if payment_type.is_none() {
        c.fail("payment_type", "Payment type must be either CASH or CREDIT");
    }
    let notes = c.optional_text("notes", input.notes.as_deref(), "Notes", 5);

    let refs = input.products.as_deref().unwrap_or_default();
    if require_products && refs.is_empty() {
        c.fail("products", "At least one product is required");
    }
    for (idx, p) in refs.iter().enumerate() {
        if p.product_id <= 0 {
            c.fail(
                &format!("products.{}.product_id", idx),
                "Product ID must be positive",
            );
        }
    }
    let product_ids = refs.iter().map(|p| p.product_id).collect();

    c.finish(|| {
        Some(ValidInvoiceInput {
            invoice_no: invoice_no?,
            customer_name: customer_name?,
            salesperson: salesperson?,
            payment_type: payment_type?,
            notes,
            product_ids,
        })
    })
}
