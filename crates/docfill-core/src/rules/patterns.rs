//! Common regex patterns for shipping and trade document extraction.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Date shapes
    pub static ref DATE_ISO: Regex = Regex::new(
        r"\b(\d{4})[-/.](\d{1,2})[-/.](\d{1,2})\b"
    ).unwrap();

    pub static ref DATE_NUMERIC: Regex = Regex::new(
        r"\b(\d{1,2})[/.\-](\d{1,2})[/.\-](\d{4})\b"
    ).unwrap();

    pub static ref DATE_MONTH_FIRST: Regex = Regex::new(
        r"(?i)\b(jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\.?\s+(\d{1,2})(?:st|nd|rd|th)?,?\s+(\d{4})\b"
    ).unwrap();

    pub static ref DATE_DAY_FIRST: Regex = Regex::new(
        r"(?i)\b(\d{1,2})(?:st|nd|rd|th)?[\s\-/.]+(jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\.?[\s\-/.,]+(\d{4}|\d{2})\b"
    ).unwrap();
}

lazy_static! {
    // Date labels
    pub static ref SHIPPED_ON_BOARD: Regex = Regex::new(
        r"(?i)\b(?:shipped|laden|loaded)\s+on\s+board(?:\s+date)?|\bon\s+board\s+date|\bATD\b"
    ).unwrap();

    pub static ref ETA_LABEL: Regex = Regex::new(
        r"(?i)\bETA\b|\bestimated\s+(?:time\s+of\s+)?arrival\b"
    ).unwrap();

    pub static ref INVOICE_DATE_LABEL: Regex = Regex::new(
        r"(?i)\binvoice\s+date\b|\bdate\s+of\s+invoice\b|^\s*date\b"
    ).unwrap();

    pub static ref RECEIVED_DATE_LABEL: Regex = Regex::new(
        r"(?i)\b(?:date\s+received|received\s+(?:date|on)|receipt\s+date|grn\s+date|delivery\s+date)\b"
    ).unwrap();

    pub static ref CLEARANCE_DATE_LABEL: Regex = Regex::new(
        r"(?i)\b(?:acceptance\s+date|date\s+of\s+acceptance|clearance\s+date|release\s+date|date\s+of\s+release|cleared\s+on)\b"
    ).unwrap();
}

lazy_static! {
    // Reference numbers
    pub static ref COMMERCIAL_INVOICE_NO: Regex = Regex::new(
        r"(?i)\b(?:commercial\s+)?invoice\s*(?:no\b\.?|number\b|#)\s*[:#.]?\s*([A-Z0-9][A-Z0-9/\-_.]{2,})"
    ).unwrap();

    pub static ref PROFORMA_NO: Regex = Regex::new(
        r"(?i)\b(?:pro[\s\-]?forma\s+invoice|p\.?\s?i\.?)\s*(?:no\b\.?|number\b|#)\s*[:#.]?\s*([A-Z0-9][A-Z0-9/\-_.]{2,})"
    ).unwrap();

    pub static ref PROFORMA_HEADER: Regex = Regex::new(
        r"(?i)\bpro[\s\-]?forma\s+invoice\s*[:#]\s*([A-Z0-9][A-Z0-9/\-_.]{2,})"
    ).unwrap();

    pub static ref PROFORMA_MENTION: Regex = Regex::new(
        r"(?i)\bpro[\s\-]?forma\b"
    ).unwrap();

    pub static ref BILL_OF_LADING_NO: Regex = Regex::new(
        r"(?i)\b(?:b/l|bl|bill\s+of\s+lading)\s*(?:no\b\.?|number\b|#)\s*[:#.]?\s*([A-Z0-9][A-Z0-9\-]{5,})"
    ).unwrap();

    pub static ref CARRIER_REFERENCE: Regex = Regex::new(
        r"\b[A-Z0-9]{8,20}\b"
    ).unwrap();

    pub static ref CONTAINER_NO: Regex = Regex::new(
        r"\b([A-Z]{3}[UJZ])\s?(\d{6})\s?(\d)\b"
    ).unwrap();

    pub static ref CONTAINER_SHAPE: Regex = Regex::new(
        r"^[A-Z]{3}[UJZ]\d{7}$"
    ).unwrap();

    pub static ref MRN_LABELED: Regex = Regex::new(
        r"(?i)\bMRN\b\s*(?:no\b\.?|number\b)?\s*[:#.]?\s*(\d{2}[A-Z]{2}[A-Z0-9]{14})\b"
    ).unwrap();

    pub static ref MRN_STANDALONE: Regex = Regex::new(
        r"\b(\d{2}[A-Z]{2}[A-Z0-9]{13}\d)\b"
    ).unwrap();

    pub static ref ENTRY_NUMBER: Regex = Regex::new(
        r"(?i)\b(?:entry|declaration)\s*(?:no\b\.?|number\b|#)\s*[:#.]?\s*([A-Z0-9][A-Z0-9\-]{5,})"
    ).unwrap();

    pub static ref PO_REFERENCE: Regex = Regex::new(
        r"(?i)\b(?:p\.?\s?o\.?|purchase\s+order)\s*(?:no\b\.?|number\b|#)\s*[:#.]?\s*([A-Z0-9][A-Z0-9/\-_.]{2,})"
    ).unwrap();
}

lazy_static! {
    // Contact details and section markers
    pub static ref CONTACT_LINE: Regex = Regex::new(
        r"(?i)\b(?:tel|fax|phone|mob|mobile|e-?mail|web|www)\b|@|\+\d{2,}"
    ).unwrap();

    pub static ref CONTACT_PREFIX: Regex = Regex::new(
        r"(?i)^(?:tel|fax|phone|mob)"
    ).unwrap();
}

lazy_static! {
    // Counterparty
    pub static ref COMPANY_SUFFIX: Regex = Regex::new(
        r"(?i)\b(?:co\.?,?\s*ltd|company\s+limited|limited|ltd|inc|llc|corp|corporation|gmbh|pty|plc|s\.?r\.?l|b\.?v)\b|有限公司|株式会社"
    ).unwrap();

    pub static ref DOCUMENT_MARKER: Regex = Regex::new(
        r"(?i)\b(?:pro[\s\-]?forma\s+invoice|commercial\s+invoice|invoice|purchase\s+order|quotation)\b"
    ).unwrap();

    pub static ref SECTION_BOUNDARY: Regex = Regex::new(
        r"(?i)^\s*(?:to|bill\s+to|ship\s+to|sold\s+to|buyer|consignee|notify|messrs|attn|date|invoice|purchase\s+order)\b"
    ).unwrap();

    pub static ref PARTY_LABEL: Regex = Regex::new(
        r"(?i)^\s*(?:seller|supplier|exporter|shipper|vendor|from|manufacturer)\s*[:\-]\s*"
    ).unwrap();
}

lazy_static! {
    // Transport
    pub static ref VESSEL_VOYAGE_LABEL: Regex = Regex::new(
        r"(?i)\b(?:ocean\s+)?vessel(?:\s+name)?\s*(?:/|&|and)\s*voy(?:age)?\.?(?:\s*(?:no\b\.?|number\b))?"
    ).unwrap();

    pub static ref VESSEL_LABEL: Regex = Regex::new(
        r"(?i)\b(?:ocean\s+vessel|vessel\s+name|name\s+of\s+vessel|vessel|m/v)\b"
    ).unwrap();

    pub static ref VOYAGE_LABEL: Regex = Regex::new(
        r"(?i)\bvoy(?:age)?\b\.?(?:\s*(?:no\b\.?|number\b|#))?"
    ).unwrap();

    pub static ref PORT_OF_LOADING_LABEL: Regex = Regex::new(
        r"(?i)\b(?:port\s+of\s+loading|port\s+of\s+lading|loading\s+port|pol)\b"
    ).unwrap();

    pub static ref PORT_OF_DISCHARGE_LABEL: Regex = Regex::new(
        r"(?i)\b(?:port\s+of\s+discharge|port\s+of\s+destination|discharge\s+port|pod)\b"
    ).unwrap();

    pub static ref COLUMN_SPLIT: Regex = Regex::new(
        r"\t+|\s{2,}"
    ).unwrap();
}

lazy_static! {
    // Quantities and measurements
    pub static ref GROSS_WEIGHT: Regex = Regex::new(
        r"(?i)\b(?:total\s+)?(?:gross\s*weight|g\.\s*w\.?|g/w)\s*(?:\((kgs?)\))?\s*[:.]?\s*(\d{1,3}(?:,\d{3})+(?:\.\d+)?|\d+(?:\.\d+)?)\s*(kgs?|kilos?|kilograms?)?"
    ).unwrap();

    pub static ref NET_WEIGHT: Regex = Regex::new(
        r"(?i)\b(?:total\s+)?(?:net\s*weight|n\.\s*w\.?|n/w)\s*(?:\((kgs?)\))?\s*[:.]?\s*(\d{1,3}(?:,\d{3})+(?:\.\d+)?|\d+(?:\.\d+)?)\s*(kgs?|kilos?|kilograms?)?"
    ).unwrap();

    pub static ref UNIT_WEIGHT: Regex = Regex::new(
        r"(?i)(\d{1,3}(?:,\d{3})+(?:\.\d+)?|\d+(?:\.\d+)?)\s*(?:kgs?|kilos?)\b"
    ).unwrap();

    pub static ref VOLUME: Regex = Regex::new(
        r"(?i)(\d{1,3}(?:,\d{3})+(?:\.\d+)?|\d+(?:\.\d+)?)\s*(?:(?:cbm|m3|cu\.?\s*m)\b|m³)"
    ).unwrap();

    pub static ref TOTAL_CARTONS_LABELED: Regex = Regex::new(
        r"(?i)\b(?:total\s+(?:cartons|ctns|packages|pkgs)|no\.?\s+of\s+(?:cartons|packages|pkgs))\s*[:.]?\s*(\d{1,3}(?:,\d{3})+|\d+)\b"
    ).unwrap();

    pub static ref TOTAL_CARTONS_TRAILING: Regex = Regex::new(
        r"(?i)\btotal\b[^\n\d]{0,30}?(\d{1,3}(?:,\d{3})+|\d+)\s*(?:cartons?|ctns?|pkgs?|packages?)\b"
    ).unwrap();

    pub static ref NUMBER_TOKEN: Regex = Regex::new(
        r"\d{1,3}(?:,\d{3})+(?:\.\d+)?|\d+(?:\.\d+)?"
    ).unwrap();
}

lazy_static! {
    // Container/receive type, most specific first
    pub static ref TYPE_45HC: Regex = Regex::new(
        r"(?i)(?:^|[^0-9])45\s*'?\s*(?:hc|hq|high\s*cube)\b"
    ).unwrap();

    pub static ref TYPE_40HC: Regex = Regex::new(
        r"(?i)(?:^|[^0-9])40\s*'?\s*(?:hc|hq|high\s*cube)\b"
    ).unwrap();

    pub static ref TYPE_20HC: Regex = Regex::new(
        r"(?i)(?:^|[^0-9])20\s*'?\s*(?:hc|hq|high\s*cube)\b"
    ).unwrap();

    pub static ref TYPE_45GP: Regex = Regex::new(
        r"(?i)(?:^|[^0-9])45\s*(?:'|ft\b|foot\b|feet\b|gp\b|dv\b|dc\b|std?\b)"
    ).unwrap();

    pub static ref TYPE_40GP: Regex = Regex::new(
        r"(?i)(?:^|[^0-9])40\s*(?:'|ft\b|foot\b|feet\b|gp\b|dv\b|dc\b|std?\b)"
    ).unwrap();

    pub static ref TYPE_20GP: Regex = Regex::new(
        r"(?i)(?:^|[^0-9])20\s*(?:'|ft\b|foot\b|feet\b|gp\b|dv\b|dc\b|std?\b)"
    ).unwrap();

    pub static ref TYPE_LCL: Regex = Regex::new(
        r"(?i)\blcl\b|\bcfs\s*/\s*cfs\b|\bless\s+than\s+container"
    ).unwrap();
}

lazy_static! {
    // SKUs
    pub static ref SKU_SHAPE: Regex = Regex::new(
        r"^[A-Z0-9][A-Z0-9\-_./]{2,29}$"
    ).unwrap();

    pub static ref UNIT_SUFFIXED: Regex = Regex::new(
        r"^\d+(?:[.,]\d+)?[A-Z]{1,3}$"
    ).unwrap();

    pub static ref SUMMARY_ROW: Regex = Regex::new(
        r"(?i)^\s*(?:sub\s*-?\s*total|total|grand\s+total)\b"
    ).unwrap();

    pub static ref SHIPMENT_LEG: Regex = Regex::new(
        r"^(.+?)-(?:SEA|AIR|RAIL)(?:-.*)?$"
    ).unwrap();

    pub static ref CURRENCY_PREFIX: Regex = Regex::new(
        r"(?i)^(?:US\$|USD|EUR|GBP|RMB|CNY|\$|€|£|¥)"
    ).unwrap();
}

lazy_static! {
    // Line-item table headers
    pub static ref PER_CARTON_HEADER: Regex = Regex::new(
        r"(?i)(?:pcs|qty|units|pieces)\s*/\s*(?:ctn|carton)|\bper\s+(?:ctn|carton)"
    ).unwrap();

    pub static ref CARTONS_HEADER: Regex = Regex::new(
        r"(?i)\b(?:ctns|cartons)\b"
    ).unwrap();
}

lazy_static! {
    // Shipping marks
    pub static ref SHIPPING_MARK_ANCHOR: Regex = Regex::new(
        r"(?i)\bshipping\s+marks?\b"
    ).unwrap();

    pub static ref MARK_CARTONS: Regex = Regex::new(
        r"(?i)\b(?:total\s+)?(?:ctns?|cartons?)\b\s*(?:qty\b|no\b\.?)?\s*[:#.]?\s*(\d{1,6})\b|\b(\d{1,6})\s*(?:ctns|cartons)\b|\bc/no\.?\s*:?\s*1\s*[-~]\s*(\d{1,6})\b"
    ).unwrap();

    pub static ref MARK_UNITS_PER_CARTON: Regex = Regex::new(
        r"(?i)\b(?:pcs|qty|units|pieces)\s*(?:/|per)\s*(?:ctn|carton)\b\s*[:#.]?\s*(\d{1,6})\b|\b(\d{1,6})\s*(?:pcs|units|pieces)\s*(?:/|per)\s*(?:ctn|carton)\b"
    ).unwrap();

    pub static ref MARK_COMMODITY_CODE: Regex = Regex::new(
        r"(?i)\b(?:hs\s*code|h\.s\.\s*code|commodity\s*code|hts(?:\s*code)?|tariff\s*code)\s*[:#.]?\s*(\d{4}(?:[.\s]?\d{2}){1,3})\b"
    ).unwrap();

    pub static ref MARK_ORIGIN: Regex = Regex::new(
        r"(?i)\b(?:made\s+in|country\s+of\s+origin|origin)\s*[:.]?\s*([A-Za-z][A-Za-z .]{1,30}?)\s*$"
    ).unwrap();

    pub static ref MARK_NET_WEIGHT: Regex = Regex::new(
        r"(?i)(?:\bn\.\s*w\.?|\bnet\s*weight|\bn/w|\bnw\b)\s*(?:\(kgs?\))?\s*[:.]?\s*(\d+(?:\.\d+)?)"
    ).unwrap();

    pub static ref MARK_GROSS_WEIGHT: Regex = Regex::new(
        r"(?i)(?:\bg\.\s*w\.?|\bgross\s*weight|\bg/w|\bgw\b)\s*(?:\(kgs?\))?\s*[:.]?\s*(\d+(?:\.\d+)?)"
    ).unwrap();

    pub static ref MARK_DIMENSIONS: Regex = Regex::new(
        r"(?i)(\d+(?:\.\d+)?)\s*(?:cm)?\s*[x×*]\s*(\d+(?:\.\d+)?)\s*(?:cm)?\s*[x×*]\s*(\d+(?:\.\d+)?)\s*(cm|mm|m)?\b"
    ).unwrap();

    pub static ref MARK_PRODUCT_NUMBER: Regex = Regex::new(
        r"(?i)\b(?:item|product|art(?:icle)?|style|model)\s*(?:no\b\.?|number\b|#)\s*[:#.]?\s*([A-Z0-9][A-Z0-9\-]{1,20})"
    ).unwrap();

    pub static ref SKU_LABEL: Regex = Regex::new(
        r"(?i)^\s*(?:sku|item\s+code|code)\s*(?:no\b\.?)?\s*[:#.]?\s*"
    ).unwrap();
}
