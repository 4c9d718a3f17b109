use super::format::{blank, file_date, pad_index};
use crate::file::{Columns, FilePresenter};
use crate::records::Customer;
use chrono::NaiveDate;

#[derive(Debug, Clone)]
pub struct CustomerFileContext {
    pub file_prefix: String,
    pub region: String,
    pub file_reference: String,
    pub file_date: NaiveDate,
}

pub struct CustomerFilePresenter;

impl FilePresenter for CustomerFilePresenter {
    type Context = CustomerFileContext;
    type Record = Customer;

    fn head(&self, ctx: &CustomerFileContext, index: usize) -> Columns {
        Columns::from([
            ("col01", "H".to_string()),
            ("col02", pad_index(index)),
            ("col03", ctx.file_prefix.to_uppercase()),
            ("col04", ctx.region.clone()),
            ("col05", "C".to_string()),
            ("col06", ctx.file_reference.clone()),
            ("col07", file_date(ctx.file_date)),
        ])
    }

    fn body(&self, _ctx: &CustomerFileContext, c: &Customer, index: usize) -> Columns {
        let line = |n: usize| blank(c.address_lines[n].as_deref());
        Columns::from([
            ("col01", "D".to_string()),
            ("col02", pad_index(index)),
            ("col03", c.customer_reference.clone()),
            ("col04", c.customer_name.clone()),
            ("col05", line(0)),
            ("col06", line(1)),
            ("col07", line(2)),
            ("col08", line(3)),
            ("col09", line(4)),
            ("col10", line(5)),
            ("col11", blank(c.postcode.as_deref())),
        ])
    }

    fn tail(&self, _ctx: &CustomerFileContext, index: usize) -> Columns {
        Columns::from([
            ("col01", "T".to_string()),
            ("col02", pad_index(index)),
            ("col03", (index + 1).to_string()),
        ])
    }
}
